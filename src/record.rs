//! Canonical record schema and the normalization boundary.
//!
//! Every source emits raw attribute bags with its own labels ("Câmbio",
//! "cambio", "Transmissão", ...). [`normalize`] resolves those synonyms
//! through one declarative table per field and applies the unit policies,
//! producing the [`CanonicalRecord`] that the rest of the pipeline — and
//! every downstream consumer — sees. Normalization is pure and idempotent:
//! feeding a canonical record back through it is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::text;

/// A raw attribute bag as produced by card and detail extraction.
///
/// Keys are folded (case + diacritics) on insert so "Potência do Motor"
/// and "potencia do motor" land in the same slot. The first value written
/// for a key wins — later, lower-confidence extraction tiers never
/// overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    fields: BTreeMap<String, String>,
    pub forbidden_matches: BTreeSet<String>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under the folded `key` unless the slot is already
    /// filled or the value is empty.
    pub fn put(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        let folded = text::fold(key);
        self.fields
            .entry(folded)
            .or_insert_with(|| trimmed.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&text::fold(key)).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(&text::fold(key))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.forbidden_matches.is_empty()
    }

    /// First non-empty value among `keys`, probed in priority order.
    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Fold `other` into `self`. Existing fields keep their values; the
    /// forbidden-word annotations union.
    pub fn merge(&mut self, other: AttributeBag) {
        for (key, value) in other.fields {
            self.fields.entry(key).or_insert(value);
        }
        self.forbidden_matches.extend(other.forbidden_matches);
    }
}

// ── Synonym tables ────────────────────────────────────────────────────────
//
// Priority order matters: the canonical field name comes first so that a
// re-normalized record resolves to itself, then source labels from most to
// least specific. All entries are pre-folded.

const TITLE: &[&str] = &["title", "nome do carro", "nome"];
const PRICE: &[&str] = &["price", "valor", "preco"];
const MILEAGE: &[&str] = &["mileage", "quilometragem", "km", "kilometragem"];
const LOCATION: &[&str] = &["location", "localizacao", "local"];
const IMAGE_URL: &[&str] = &["image_url", "imagem", "image", "foto"];
const DETAIL_URL: &[&str] = &["detail_url", "link", "url"];
const SOURCE_NAME: &[&str] = &["source_name", "portal"];
const YEAR: &[&str] = &["year", "ano", "ano de fabricacao", "fabricado"];
const ENGINE_POWER: &[&str] = &[
    "potencia do motor",
    "potenciamotor",
    "potencia",
    "potencia (hp)",
    "motor",
];
const DOOR_COUNT: &[&str] = &["door_count", "portas", "qtd de portas", "numero de portas"];
const STEERING: &[&str] = &["steering_type", "direcao", "tipo de direcao", "tipodirecao"];
const TRANSMISSION: &[&str] = &["transmission", "cambio", "transmissao"];
const FUEL: &[&str] = &["fuel_type", "combustivel"];
const COLOR: &[&str] = &["color", "cor"];
const DESCRIPTION: &[&str] = &["description", "descricao"];

/// The normalized, source-independent representation of one listing.
///
/// `detail_url` is the record's identity within a run: liking, ranking and
/// dedup all key on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalRecord {
    pub title: String,
    pub price: String,
    pub mileage: String,
    pub location: String,
    pub image_url: String,
    pub detail_url: String,
    pub source_name: String,
    pub year: String,
    pub engine_displacement: String,
    pub horsepower: String,
    /// Holds a parsed integer rendered back to text, or is empty.
    pub door_count: String,
    pub steering_type: String,
    pub transmission: String,
    pub fuel_type: String,
    pub color: String,
    pub description: String,
    pub forbidden_word_matches: BTreeSet<String>,
}

impl CanonicalRecord {
    /// Re-expose the record as an attribute bag, for re-normalization or
    /// merging with later extraction output.
    pub fn to_bag(&self) -> AttributeBag {
        let mut bag = AttributeBag::new();
        bag.put("title", &self.title);
        bag.put("price", &self.price);
        bag.put("mileage", &self.mileage);
        bag.put("location", &self.location);
        bag.put("image_url", &self.image_url);
        bag.put("detail_url", &self.detail_url);
        bag.put("source_name", &self.source_name);
        bag.put("year", &self.year);
        bag.put("engine_displacement", &self.engine_displacement);
        bag.put("horsepower", &self.horsepower);
        bag.put("door_count", &self.door_count);
        bag.put("steering_type", &self.steering_type);
        bag.put("transmission", &self.transmission);
        bag.put("fuel_type", &self.fuel_type);
        bag.put("color", &self.color);
        bag.put("description", &self.description);
        bag.forbidden_matches = self.forbidden_word_matches.clone();
        bag
    }
}

/// Resolve a raw attribute bag into the canonical schema.
pub fn normalize(bag: &AttributeBag) -> CanonicalRecord {
    let verbatim = |keys: &[&str]| bag.first_of(keys).unwrap_or_default().to_string();
    let (engine_displacement, horsepower) = classify_engine_power(bag);

    CanonicalRecord {
        title: verbatim(TITLE),
        price: verbatim(PRICE),
        mileage: bag
            .first_of(MILEAGE)
            .map(normalize_mileage)
            .unwrap_or_default(),
        location: verbatim(LOCATION),
        image_url: verbatim(IMAGE_URL),
        detail_url: verbatim(DETAIL_URL),
        source_name: verbatim(SOURCE_NAME),
        year: verbatim(YEAR),
        engine_displacement,
        horsepower,
        door_count: bag
            .first_of(DOOR_COUNT)
            .map(normalize_door_count)
            .unwrap_or_default(),
        steering_type: verbatim(STEERING),
        transmission: verbatim(TRANSMISSION),
        fuel_type: verbatim(FUEL),
        color: verbatim(COLOR),
        description: verbatim(DESCRIPTION),
        forbidden_word_matches: bag.forbidden_matches.clone(),
    }
}

/// Mileage policy: digits before a "km" token win; otherwise the first
/// digit run. Thousands separators are stripped and the unit re-appended,
/// so "34.200 km", "34200" and "34.200" all normalize to "34200 km".
/// A value with no digits at all stays empty.
fn normalize_mileage(raw: &str) -> String {
    let folded = text::fold(raw);
    let number = if let Some(km_pos) = folded.find("km") {
        text::all_digits(&folded[..km_pos])
    } else {
        None
    };
    match number.or_else(|| leading_number(&folded)) {
        Some(n) => format!("{n} km"),
        None => String::new(),
    }
}

/// First contiguous number in `s`, tolerating `.`/`,` thousands separators.
fn leading_number(s: &str) -> Option<u64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let run: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();
    run.parse().ok()
}

/// Door policy: the first integer substring, or nothing. Boolean-like
/// answers ("sim", "não", "yes") never survive into the canonical record.
fn normalize_door_count(raw: &str) -> String {
    match text::first_int(raw) {
        Some(n) => n.to_string(),
        None => String::new(),
    }
}

/// Engine-power policy, returning `(engine_displacement, horsepower)`.
///
/// An explicit hp/cv unit token marks true horsepower, stored verbatim.
/// Anything else — typically a bare displacement like "1.3" — is engine
/// displacement only; it is never mirrored into `horsepower`.
fn classify_engine_power(bag: &AttributeBag) -> (String, String) {
    // Already-canonical values short-circuit, keeping normalize idempotent.
    if let Some(hp) = bag.get("horsepower") {
        return (
            bag.get("engine_displacement").unwrap_or_default().to_string(),
            hp.to_string(),
        );
    }
    if let Some(disp) = bag.get("engine_displacement") {
        return (disp.to_string(), String::new());
    }

    let Some(raw) = bag.first_of(ENGINE_POWER) else {
        return (String::new(), String::new());
    };
    if has_horsepower_unit(raw) {
        (String::new(), raw.to_string())
    } else {
        (raw.to_string(), String::new())
    }
}

/// Whether `raw` carries an explicit horsepower unit ("hp" or "cv") as a
/// standalone token.
pub fn has_horsepower_unit(raw: &str) -> bool {
    let folded = text::fold(raw);
    folded.split(|c: char| !c.is_ascii_alphanumeric()).any(|tok| {
        matches!(tok, "hp" | "cv")
            || tok
                .strip_suffix("hp")
                .or_else(|| tok.strip_suffix("cv"))
                .is_some_and(|head| !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()))
    })
}
