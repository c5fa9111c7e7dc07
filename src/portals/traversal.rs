//! Shared listing traversal for every portal.
//!
//! One state machine drives all six marketplaces: build the listing URL,
//! fetch it, extract cards (skipping recommendation carousels), apply local
//! filters, optionally capture each detail page, normalize, hand the record
//! to the caller, then advance to the next page. Three guards terminate a
//! run early: the portal's page cap, a page yielding zero new detail links,
//! and a listing URL repeating itself.
//!
//! DOM work happens in synchronous helpers between await points because the
//! `scraper` crate's types are `!Send`.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::acquisition::{FetchError, Fetched, PageSource};
use crate::cancel::CancelToken;
use crate::extract;
use crate::filters::FilterSpec;
use crate::record::{normalize, AttributeBag, CanonicalRecord};
use crate::text;

use super::{mercado_livre, NextPage, Portal};

/// One listing card, before detail capture and normalization.
pub struct CardSummary {
    pub bag: AttributeBag,
    pub detail_url: String,
}

/// Run one portal to completion. Records are handed to `on_record` in
/// discovery order; the return value is how many were produced.
pub async fn run_portal(
    portal: &Portal,
    filters: &FilterSpec,
    source: &mut dyn PageSource,
    cancel: &CancelToken,
    on_record: &mut dyn FnMut(CanonicalRecord),
) -> Result<usize, FetchError> {
    let mut seen_details: HashSet<String> = HashSet::new();
    let mut visited_pages: HashSet<String> = HashSet::new();
    let mut url = (portal.build_url)(filters, 1);
    let mut page = 1usize;
    let mut collected = 0usize;

    'pages: while page <= portal.page_cap {
        if cancel.is_cancelled() {
            info!(portal = portal.name, page, "cancelled before listing fetch");
            break;
        }
        if !visited_pages.insert(url.clone()) {
            debug!(portal = portal.name, %url, "listing URL repeated, stopping");
            break;
        }

        info!(portal = portal.name, page, %url, "fetching listing page");
        let fetched = source.listing_page(&url).await?;
        let html = match fetched.html() {
            Some(html) => html,
            None => {
                warn!(portal = portal.name, page, "empty listing page, skipping");
                match portal.next_page {
                    NextPage::Numbered => {
                        page += 1;
                        url = (portal.build_url)(filters, page);
                        continue;
                    }
                    // Without the page there is no next link to follow.
                    NextPage::LinkThenOffset { .. } => break,
                }
            }
        };

        let cards = extract_cards(html, portal);
        let fresh: Vec<CardSummary> = cards
            .into_iter()
            .filter(|c| !seen_details.contains(&c.detail_url))
            .collect();
        if fresh.is_empty() {
            info!(portal = portal.name, page, "no new listings, stopping");
            break;
        }
        let page_count = fresh.len();
        debug!(portal = portal.name, page, cards = page_count, "cards extracted");

        for card in fresh {
            if cancel.is_cancelled() {
                info!(portal = portal.name, "cancelled mid-page");
                break 'pages;
            }
            seen_details.insert(card.detail_url.clone());

            if !passes_local_filters(filters, &card) {
                debug!(portal = portal.name, url = %card.detail_url, "card filtered out");
                continue;
            }

            let mut bag = card.bag;
            if filters.capture_details {
                match source.detail_page(&card.detail_url).await? {
                    Fetched::Page(detail_html) => {
                        bag.merge(extract::extract_detail(&detail_html, &filters.forbidden_words));
                    }
                    Fetched::Empty => {
                        warn!(portal = portal.name, url = %card.detail_url, "detail page empty");
                    }
                }
            } else {
                let title = bag.get("title").unwrap_or_default().to_string();
                bag.forbidden_matches =
                    extract::scan_forbidden(&text::fold(&title), &filters.forbidden_words);
            }

            let record = normalize(&bag);
            if !passes_record_filters(filters, &record) {
                debug!(portal = portal.name, url = %record.detail_url, "record filtered out");
                continue;
            }
            on_record(record);
            collected += 1;
        }

        match portal.next_page {
            NextPage::Numbered => {
                page += 1;
                url = (portal.build_url)(filters, page);
            }
            NextPage::LinkThenOffset { page_size } => {
                page += 1;
                url = match find_next_url(html, &url) {
                    Some(next) => next,
                    None => mercado_livre::next_offset_url(
                        &url,
                        if page_count > 0 { page_count } else { page_size },
                    ),
                };
            }
        }
    }

    info!(portal = portal.name, records = collected, "portal finished");
    Ok(collected)
}

// ── Card extraction (sync) ────────────────────────────────────────────────

fn parse_selector(s: &str) -> Option<Selector> {
    match Selector::parse(s) {
        Ok(sel) => Some(sel),
        Err(_) => {
            warn!(selector = s, "invalid selector in portal config");
            None
        }
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(card: ElementRef, selectors: &[&str]) -> Option<String> {
    for s in selectors {
        let sel = parse_selector(s)?;
        if let Some(el) = card.select(&sel).next() {
            let t = element_text(el);
            if !t.is_empty() {
                return Some(t);
            }
        }
    }
    None
}

/// Whether `el` sits inside a recommendation carousel: an ancestor tagged
/// `data-component="Rec-Gallery"`, an ancestor with a `Recommendation`
/// class fragment, or an ancestor whose own heading reads "Baseado na sua
/// navegação". The heading check looks at direct children only, so a
/// carousel heading elsewhere on the page never poisons real results.
fn in_recommendation_carousel(el: ElementRef) -> bool {
    for node in el.ancestors() {
        let Some(ancestor) = ElementRef::wrap(node) else {
            continue;
        };
        let v = ancestor.value();
        if v.attr("data-component") == Some("Rec-Gallery") {
            return true;
        }
        if v.attr("class").is_some_and(|c| c.contains("Recommendation")) {
            return true;
        }
        for child in ancestor.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                if child_el.value().name() == "h2"
                    && text::fold(&element_text(child_el)).contains("baseado na sua navegacao")
                {
                    return true;
                }
            }
        }
    }
    false
}

/// Resolve an href against the portal base, dropping query and fragment so
/// the same listing dedups across pages.
fn resolve_detail_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let mut resolved = base.join(href).ok()?;
    resolved.set_query(None);
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn card_link(card: ElementRef, portal: &Portal) -> Option<String> {
    if card.value().name() == "a" {
        if let Some(href) = card.value().attr("href") {
            let url = resolve_detail_url(portal.base, href)?;
            if (portal.accept_link)(&url) {
                return Some(url);
            }
        }
    }
    let anchor_sel = parse_selector("a[href]")?;
    for a in card.select(&anchor_sel) {
        if let Some(href) = a.value().attr("href") {
            if let Some(url) = resolve_detail_url(portal.base, href) {
                if (portal.accept_link)(&url) {
                    return Some(url);
                }
            }
        }
    }
    None
}

/// Extract card summaries from a listing page. The first card selector
/// producing matches wins; cards without an acceptable detail link and
/// carousel cards are dropped.
pub fn extract_cards(html: &str, portal: &Portal) -> Vec<CardSummary> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for selector in portal.cards {
        let Some(sel) = parse_selector(selector) else {
            continue;
        };
        let matches: Vec<ElementRef> = doc.select(&sel).collect();
        if matches.is_empty() {
            continue;
        }

        for card in matches {
            if in_recommendation_carousel(card) {
                debug!(portal = portal.name, "skipping recommendation-carousel card");
                continue;
            }
            let Some(detail_url) = card_link(card, portal) else {
                continue;
            };

            let mut bag = AttributeBag::new();
            bag.put("source_name", portal.name);
            bag.put("detail_url", &detail_url);
            if let Some(t) = first_text(card, portal.fields.title) {
                bag.put("title", t);
            }
            if let Some(t) = first_text(card, portal.fields.price) {
                bag.put("price", t);
            }
            if let Some(t) = first_text(card, portal.fields.location) {
                bag.put("location", t);
            }
            if let Some(t) = first_text(card, portal.fields.mileage) {
                bag.put("mileage", t);
            }
            if let Some(t) = first_text(card, portal.fields.year) {
                bag.put("year", t);
            }
            if let Some(img) = first_image(card, portal.fields.image) {
                bag.put("image_url", img);
            }
            out.push(CardSummary { bag, detail_url });
        }
        break;
    }
    out
}

fn first_image(card: ElementRef, selectors: &[&str]) -> Option<String> {
    for s in selectors {
        let sel = parse_selector(s)?;
        for el in card.select(&sel) {
            let v = el.value();
            if let Some(src) = v.attr("src").or_else(|| v.attr("data-src")) {
                if !src.trim().is_empty() {
                    return Some(src.trim().to_string());
                }
            }
        }
    }
    None
}

// ── Next-page detection (sync) ────────────────────────────────────────────

/// Find the page's own next-page link: `rel=next` first, then anchors whose
/// label or text reads "Próxima"/"Avançar"/"Seguinte".
pub fn find_next_url(html: &str, current_url: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let candidate = next_anchor_href(&doc)?;
    let base = Url::parse(current_url).ok()?;
    let resolved = base.join(&candidate).ok()?;
    Some(resolved.to_string())
}

fn next_anchor_href(doc: &Html) -> Option<String> {
    let rel_next = parse_selector("a[rel=next]")?;
    if let Some(a) = doc.select(&rel_next).next() {
        if let Some(href) = a.value().attr("href") {
            return Some(href.to_string());
        }
    }

    let anchors = parse_selector("a[href]")?;
    for a in doc.select(&anchors) {
        let v = a.value();
        let label = v
            .attr("aria-label")
            .or_else(|| v.attr("title"))
            .unwrap_or_default();
        let folded_label = text::fold(label);
        if folded_label.contains("proxima") || folded_label.contains("avancar") {
            return v.attr("href").map(str::to_string);
        }
        let folded_text = text::fold(&element_text(a));
        if matches!(
            folded_text.as_str(),
            "proxima" | "proxima pagina" | "avancar" | "seguinte" | ">"
        ) {
            return v.attr("href").map(str::to_string);
        }
    }
    None
}

// ── Local filters (sync) ──────────────────────────────────────────────────

/// Constraints the listing URL cannot express: model and body-type
/// substrings against the card title and numeric mileage bounds. A card
/// missing the attribute passes; detail capture may still fill it in.
fn passes_local_filters(filters: &FilterSpec, card: &CardSummary) -> bool {
    for raw in [filters.modelo.as_deref(), filters.carroceria.as_deref()] {
        let Some(raw) = raw else {
            continue;
        };
        let wanted = text::fold(raw);
        if !wanted.is_empty() {
            let title = text::fold(card.bag.get("title").unwrap_or_default());
            if !title.is_empty() && !title.contains(&wanted) {
                return false;
            }
        }
    }

    if let Some(raw_km) = card.bag.get("mileage") {
        if let Some(km) = text::all_digits(raw_km) {
            if filters.km_min_num().is_some_and(|min| km < min) {
                return false;
            }
            if filters.km_max_num().is_some_and(|max| km > max) {
                return false;
            }
        }
    }
    true
}

/// Constraints only the normalized record can answer: doors, fuel,
/// transmission and color. An empty record field passes; the sites omit
/// these more often than not.
fn passes_record_filters(filters: &FilterSpec, record: &CanonicalRecord) -> bool {
    if let Some(portas) = filters.portas.as_deref() {
        let want = text::first_int(portas);
        let have = text::first_int(&record.door_count);
        if let (Some(want), Some(have)) = (want, have) {
            if want != have {
                return false;
            }
        }
    }

    for (wanted, have) in [
        (filters.combustivel.as_deref(), record.fuel_type.as_str()),
        (filters.transmissao.as_deref(), record.transmission.as_str()),
        (filters.cor.as_deref(), record.color.as_str()),
    ] {
        let Some(wanted) = wanted else {
            continue;
        };
        let wanted = text::fold(wanted);
        let have = text::fold(have);
        if !wanted.is_empty() && !have.is_empty() && !have.contains(&wanted) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portals::{olx, registry};

    const LISTING_HTML: &str = r#"
        <html><body>
          <section class="olx-adcard">
            <a href="/autos-e-pecas/carros-vans-e-utilitarios/fiat-argo-2019?rec=1#top">
              <h2 class="olx-adcard__title">Fiat Argo Drive 1.0</h2>
              <span class="olx-adcard__price">R$ 52.900</span>
              <span class="olx-adcard__location">Belo Horizonte</span>
              <span class="olx-adcard__detail">41.000 km</span>
              <img src="https://img.olx.com.br/argo.jpg">
            </a>
          </section>
          <div data-component="Rec-Gallery">
            <section class="olx-adcard">
              <a href="/autos-e-pecas/carros-vans-e-utilitarios/sugerido-999">
                <h2 class="olx-adcard__title">Sugerido</h2>
              </a>
            </section>
          </div>
          <div>
            <h2>Baseado na sua navegação</h2>
            <section class="olx-adcard">
              <a href="/autos-e-pecas/carros-vans-e-utilitarios/sugerido-777">
                <h2 class="olx-adcard__title">Outro sugerido</h2>
              </a>
            </section>
          </div>
        </body></html>"#;

    #[test]
    fn carousel_cards_are_excluded() {
        let cards = extract_cards(LISTING_HTML, &olx::PORTAL);
        assert_eq!(cards.len(), 1);
        assert_eq!(
            cards[0].detail_url,
            "https://www.olx.com.br/autos-e-pecas/carros-vans-e-utilitarios/fiat-argo-2019"
        );
        assert_eq!(cards[0].bag.get("title"), Some("Fiat Argo Drive 1.0"));
        assert_eq!(cards[0].bag.get("mileage"), Some("41.000 km"));
        assert_eq!(cards[0].bag.get("source_name"), Some("OLX"));
    }

    #[test]
    fn detail_urls_lose_query_and_fragment() {
        let cards = extract_cards(LISTING_HTML, &olx::PORTAL);
        assert!(!cards[0].detail_url.contains('?'));
        assert!(!cards[0].detail_url.contains('#'));
    }

    #[test]
    fn next_link_signals_in_priority_order() {
        let rel = r#"<html><body><a rel="next" href="/p2">2</a></body></html>"#;
        assert_eq!(
            find_next_url(rel, "https://lista.mercadolivre.com.br/carros/"),
            Some("https://lista.mercadolivre.com.br/p2".to_string())
        );

        let labeled = r#"<html><body><a aria-label="Próxima página" href="/p3">›</a></body></html>"#;
        assert_eq!(
            find_next_url(labeled, "https://lista.mercadolivre.com.br/carros/"),
            Some("https://lista.mercadolivre.com.br/p3".to_string())
        );

        let texted = r#"<html><body><a href="/p4">Avançar</a></body></html>"#;
        assert_eq!(
            find_next_url(texted, "https://lista.mercadolivre.com.br/carros/"),
            Some("https://lista.mercadolivre.com.br/p4".to_string())
        );

        let none = r#"<html><body><a href="/outro">Outro</a></body></html>"#;
        assert_eq!(find_next_url(none, "https://lista.mercadolivre.com.br/carros/"), None);
    }

    #[test]
    fn model_filter_matches_folded_title() {
        let mut card = CardSummary {
            bag: AttributeBag::new(),
            detail_url: "u".to_string(),
        };
        card.bag.put("title", "Fiat ARGO Drive");

        let f = crate::filters::FilterSpec::from_json(r#"{"modelo":"argo"}"#).unwrap();
        assert!(passes_local_filters(&f, &card));

        let f = crate::filters::FilterSpec::from_json(r#"{"modelo":"civic"}"#).unwrap();
        assert!(!passes_local_filters(&f, &card));
    }

    #[test]
    fn body_type_filter_matches_folded_title() {
        let mut card = CardSummary {
            bag: AttributeBag::new(),
            detail_url: "u".to_string(),
        };
        card.bag.put("title", "Jeep Renegade SUV 2020");

        let f = crate::filters::FilterSpec::from_json(r#"{"carroceria":"suv"}"#).unwrap();
        assert!(passes_local_filters(&f, &card));

        let f = crate::filters::FilterSpec::from_json(r#"{"carroceria":"sedan"}"#).unwrap();
        assert!(!passes_local_filters(&f, &card));
    }

    #[test]
    fn record_filters_compare_detail_only_fields() {
        let mut rec = CanonicalRecord::default();
        rec.door_count = "4".to_string();
        rec.fuel_type = "Flex".to_string();
        rec.transmission = "Manual".to_string();
        rec.color = "Prata".to_string();

        let matching = crate::filters::FilterSpec::from_json(
            r#"{"portas":"4","combustivel":"flex","transmissao":"manual","cor":"prata"}"#,
        )
        .unwrap();
        assert!(passes_record_filters(&matching, &rec));

        for mismatch in [
            r#"{"portas":"2"}"#,
            r#"{"combustivel":"diesel"}"#,
            r#"{"transmissao":"automatico"}"#,
            r#"{"cor":"preto"}"#,
        ] {
            let f = crate::filters::FilterSpec::from_json(mismatch).unwrap();
            assert!(!passes_record_filters(&f, &rec), "should reject under {mismatch}");
        }
    }

    #[test]
    fn record_filters_pass_when_the_field_is_unknown() {
        let rec = CanonicalRecord::default();
        let f = crate::filters::FilterSpec::from_json(
            r#"{"portas":"2","combustivel":"diesel","transmissao":"automatico","cor":"preto"}"#,
        )
        .unwrap();
        assert!(passes_record_filters(&f, &rec));
    }

    #[test]
    fn mileage_bounds_only_apply_when_present() {
        let f = crate::filters::FilterSpec::from_json(r#"{"kmMax":"50000"}"#).unwrap();

        let mut over = CardSummary {
            bag: AttributeBag::new(),
            detail_url: "u".to_string(),
        };
        over.bag.put("mileage", "61.000 km");
        assert!(!passes_local_filters(&f, &over));

        let unknown = CardSummary {
            bag: AttributeBag::new(),
            detail_url: "u".to_string(),
        };
        assert!(passes_local_filters(&f, &unknown));
    }

    #[test]
    fn all_configured_selectors_parse() {
        for portal in registry() {
            for s in portal.cards {
                assert!(Selector::parse(s).is_ok(), "bad card selector on {}: {s}", portal.name);
            }
            for group in [
                portal.fields.title,
                portal.fields.price,
                portal.fields.location,
                portal.fields.mileage,
                portal.fields.year,
                portal.fields.image,
            ] {
                for s in group {
                    assert!(Selector::parse(s).is_ok(), "bad field selector on {}: {s}", portal.name);
                }
            }
        }
    }
}
