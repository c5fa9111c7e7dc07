//! Detail-page extraction cascade.
//!
//! Given the raw HTML of a listing's detail page, pull out labeled vehicle
//! attributes in three passes of decreasing confidence: structured
//! label/value markup first, regex patterns over visible text second, and a
//! description heuristic last. Earlier passes win — [`AttributeBag::put`]
//! keeps the first value written per field.
//!
//! All entry points are **synchronous** because the `scraper` crate's types
//! are `!Send`; callers do DOM work between await points, never across them.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::record::AttributeBag;
use crate::text;

// ── Structured pass ───────────────────────────────────────────────────────

/// Selector that is known valid at compile time. A typo here is a programmer
/// error caught by the unit tests, not a runtime condition.
fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("static selector")
}

static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| sel("tr"));
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| sel("th, td"));
static DT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| sel("dt"));
static LABEL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| sel("[class*=label], [class*=Label]"));
static META_DESC_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| sel("meta[name=description]"));
static PARAGRAPH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| sel("p"));

/// Labels that contain a field word without naming the field: "porta-copos"
/// must never feed the door count, "ano de anúncio" is not the model year.
fn label_is_decoy(folded_label: &str) -> bool {
    const DECOYS: &[&str] = &["copo", "mala", "luva", "porta-objeto", "anuncio"];
    DECOYS.iter().any(|d| folded_label.contains(d))
}

fn visible_text(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn put_pair(bag: &mut AttributeBag, label: &str, value: &str) {
    let label = label.trim().trim_end_matches(':');
    if label.is_empty() || value.trim().is_empty() {
        return;
    }
    if label_is_decoy(&text::fold(label)) {
        return;
    }
    bag.put(label, value.trim());
}

/// Walk every structured label/value shape the six marketplaces use:
/// two-cell table rows, `dt`/`dd` pairs, and `*label*`/`*value*` class pairs.
fn structured_pass(doc: &Html, bag: &mut AttributeBag) {
    for row in doc.select(&ROW_SELECTOR) {
        let cells: Vec<String> = row.select(&CELL_SELECTOR).map(visible_text).collect();
        if let [label, value] = cells.as_slice() {
            put_pair(bag, label, value);
        }
    }

    for dt in doc.select(&DT_SELECTOR) {
        let mut sibling = dt.next_sibling();
        while let Some(node) = sibling {
            if let Some(el) = ElementRef::wrap(node) {
                if el.value().name() == "dd" {
                    put_pair(bag, &visible_text(dt), &visible_text(el));
                }
                break;
            }
            sibling = node.next_sibling();
        }
    }

    for label_el in doc.select(&LABEL_SELECTOR) {
        let mut sibling = label_el.next_sibling();
        while let Some(node) = sibling {
            if let Some(el) = ElementRef::wrap(node) {
                let class = el.value().attr("class").unwrap_or_default();
                if class.contains("value") || class.contains("Value") {
                    put_pair(bag, &visible_text(label_el), &visible_text(el));
                }
                break;
            }
            sibling = node.next_sibling();
        }
    }
}

// ── Pattern pass ──────────────────────────────────────────────────────────

struct FieldPattern {
    key: &'static str,
    /// Keys that suppress this pattern: any synonym the structured pass may
    /// have filled already. Free-text matches never outrank labeled markup.
    guards: &'static [&'static str],
    regex: LazyLock<Regex>,
}

macro_rules! field_pattern {
    ($key:literal, $guards:expr, $re:literal) => {
        FieldPattern {
            key: $key,
            guards: $guards,
            regex: LazyLock::new(|| Regex::new($re).expect("static pattern")),
        }
    };
}

/// Patterns run against folded visible text, so no diacritics and no
/// uppercase appear on the left-hand side.
static FIELD_PATTERNS: [FieldPattern; 7] = [
    field_pattern!("year", &["year", "ano"], r"\bano[^\d]{0,20}((?:19|20)\d{2})"),
    field_pattern!(
        "mileage",
        &["mileage", "quilometragem", "km", "kilometragem"],
        r"\b([\d.,]+)\s*km\b"
    ),
    field_pattern!(
        "potencia do motor",
        &["horsepower", "engine_displacement", "potencia do motor", "potencia", "motor"],
        r"potencia(?:\s+do\s+motor)?\s*:?\s*([\d.,]+\s*(?:hp|cv)?)"
    ),
    // Whitespace and the plural are mandatory: "1.3 Porta-copos" must not
    // read as a door count.
    field_pattern!(
        "portas",
        &["door_count", "portas"],
        r"\b(\d)\s+portas\b"
    ),
    field_pattern!(
        "cambio",
        &["transmission", "cambio", "transmissao"],
        r"\bcambio\s*:?\s*(manual|automatico|automatizado|cvt)"
    ),
    field_pattern!(
        "direcao",
        &["steering_type", "direcao", "tipo de direcao"],
        r"\bdirecao\s*:?\s*(hidraulica|eletrica|mecanica|assistida)"
    ),
    field_pattern!(
        "combustivel",
        &["fuel_type", "combustivel"],
        r"\bcombustivel\s*:?\s*(flex|gasolina|etanol|alcool|diesel|eletrico|hibrido)"
    ),
];

fn pattern_pass(folded_text: &str, bag: &mut AttributeBag) {
    for fp in &FIELD_PATTERNS {
        if fp.guards.iter().any(|g| bag.contains(g)) {
            continue;
        }
        if let Some(caps) = fp.regex.captures(folded_text) {
            if let Some(m) = caps.get(1) {
                bag.put(fp.key, m.as_str().trim());
            }
        }
    }
}

// ── Heuristic pass ────────────────────────────────────────────────────────

/// Description fallback: the meta description when present, otherwise the
/// first reasonably long paragraph.
fn heuristic_pass(doc: &Html, bag: &mut AttributeBag) {
    if bag.contains("description") {
        return;
    }
    if let Some(meta) = doc.select(&META_DESC_SELECTOR).next() {
        if let Some(content) = meta.value().attr("content") {
            bag.put("description", content);
        }
    }
    if bag.contains("description") {
        return;
    }
    if let Some(p) = doc
        .select(&PARAGRAPH_SELECTOR)
        .map(visible_text)
        .find(|t| t.len() >= 80)
    {
        bag.put("description", p);
    }
}

// ── Public entry points ───────────────────────────────────────────────────

/// Run the full cascade over a detail page.
pub fn extract_detail(html: &str, forbidden_words: &[String]) -> AttributeBag {
    let doc = Html::parse_document(html);
    let mut bag = AttributeBag::new();

    structured_pass(&doc, &mut bag);

    let page_text = visible_body_text(&doc);
    let folded = text::fold(&page_text);
    pattern_pass(&folded, &mut bag);
    heuristic_pass(&doc, &mut bag);

    bag.forbidden_matches = scan_forbidden(&folded, forbidden_words);
    bag
}

/// Concatenated visible text of the document body.
fn visible_body_text(doc: &Html) -> String {
    doc.root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case- and accent-insensitive substring scan. Matches are advisory: they
/// annotate the record, they never drop it.
pub fn scan_forbidden(folded_text: &str, words: &[String]) -> BTreeSet<String> {
    words
        .iter()
        .filter(|w| !w.trim().is_empty())
        .filter(|w| folded_text.contains(&text::fold(w)))
        .cloned()
        .collect()
}
