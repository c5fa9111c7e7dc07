//! Preference-weighted ranking over collected records.
//!
//! Pure functions over an in-memory record slice; nothing here touches the
//! network or the event bus. The caller supplies preferences in priority
//! order plus an optional favorites set, and gets back a best-first list.

use serde::{Deserialize, Serialize};

use crate::record::CanonicalRecord;
use crate::text;

/// Rankable attributes, named the way the record stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKey {
    Mileage,
    Horsepower,
    DoorCount,
    Year,
}

impl PreferenceKey {
    /// Parse a CLI/user spelling; tolerant of the Portuguese labels the
    /// desktop UI shows.
    pub fn parse(s: &str) -> Option<Self> {
        match text::fold(s).as_str() {
            "mileage" | "km" | "quilometragem" => Some(Self::Mileage),
            "horsepower" | "potencia" | "hp" => Some(Self::Horsepower),
            "door_count" | "doors" | "portas" => Some(Self::DoorCount),
            "year" | "ano" => Some(Self::Year),
            _ => None,
        }
    }
}

/// User preferences in priority order: earlier entries weigh more
/// (`weight = len - position`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceVector {
    pub keys: Vec<PreferenceKey>,
    /// Detail URLs of hand-picked favorites; each gets a flat bonus.
    #[serde(default)]
    pub favorites: Vec<String>,
}

const FAVORITE_BONUS: f64 = 50.0;

/// Mileage above this contributes nothing; the normalization is inverted so
/// fewer kilometers score higher.
const MILEAGE_CEILING: f64 = 500_000.0;
const HORSEPOWER_SCALE: f64 = 500.0;
const DOOR_SCALE: f64 = 5.0;
const YEAR_BASELINE: f64 = 2000.0;
const YEAR_WINDOW: f64 = 25.0;

/// Normalized attribute value in `[0, 1]`; records missing the attribute
/// contribute zero for it.
fn normalized(record: &CanonicalRecord, key: PreferenceKey) -> f64 {
    let num = |s: &str| text::all_digits(s).map(|n| n as f64);
    match key {
        PreferenceKey::Mileage => match num(&record.mileage) {
            Some(km) => 1.0 - (km / MILEAGE_CEILING).min(1.0),
            None => 0.0,
        },
        PreferenceKey::Horsepower => {
            // "68,8 hp" reads as 68.8, not 688.
            let hp = record
                .horsepower
                .replace(',', ".")
                .split(|c: char| !(c.is_ascii_digit() || c == '.'))
                .find(|t| !t.is_empty())
                .and_then(|t| t.parse::<f64>().ok());
            match hp {
                Some(hp) => (hp / HORSEPOWER_SCALE).min(1.0),
                None => 0.0,
            }
        }
        PreferenceKey::DoorCount => match num(&record.door_count) {
            Some(doors) => (doors / DOOR_SCALE).min(1.0),
            None => 0.0,
        },
        PreferenceKey::Year => match num(&record.year) {
            Some(year) => ((year - YEAR_BASELINE) / YEAR_WINDOW).clamp(0.0, 1.0),
            None => 0.0,
        },
    }
}

/// Score one record against the preference vector.
pub fn score(record: &CanonicalRecord, prefs: &PreferenceVector) -> f64 {
    let n = prefs.keys.len();
    let mut total = 0.0;
    for (position, key) in prefs.keys.iter().enumerate() {
        let weight = (n - position) as f64;
        total += normalized(record, *key) * weight * 100.0;
    }
    if prefs.favorites.iter().any(|f| f == &record.detail_url) {
        total += FAVORITE_BONUS;
    }
    total
}

/// Rank records best-first. Ties keep their input (discovery) order.
pub fn rank(records: &[CanonicalRecord], prefs: &PreferenceVector) -> Vec<(f64, CanonicalRecord)> {
    let mut scored: Vec<(f64, CanonicalRecord)> = records
        .iter()
        .map(|r| (score(r, prefs), r.clone()))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(mileage: &str, hp: &str, doors: &str, year: &str, url: &str) -> CanonicalRecord {
        CanonicalRecord {
            mileage: mileage.to_string(),
            horsepower: hp.to_string(),
            door_count: doors.to_string(),
            year: year.to_string(),
            detail_url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn lower_mileage_never_scores_worse() {
        let prefs = PreferenceVector {
            keys: vec![PreferenceKey::Mileage],
            favorites: vec![],
        };
        let low = rec("30000 km", "", "", "", "a");
        let high = rec("120000 km", "", "", "", "b");
        assert!(score(&low, &prefs) > score(&high, &prefs));

        // Beyond the ceiling both floor at zero.
        let huge = rec("600000 km", "", "", "", "c");
        let huger = rec("900000 km", "", "", "", "d");
        assert_eq!(score(&huge, &prefs), score(&huger, &prefs));
    }

    #[test]
    fn earlier_preferences_weigh_more() {
        let prefs = PreferenceVector {
            keys: vec![PreferenceKey::Year, PreferenceKey::DoorCount],
            favorites: vec![],
        };
        let new_two_door = rec("", "", "2", "2025", "a");
        let old_four_door = rec("", "", "4", "2005", "b");
        assert!(score(&new_two_door, &prefs) > score(&old_four_door, &prefs));
    }

    #[test]
    fn favorite_bonus_breaks_otherwise_equal_records() {
        let prefs = PreferenceVector {
            keys: vec![PreferenceKey::Year],
            favorites: vec!["b".to_string()],
        };
        let a = rec("", "", "", "2015", "a");
        let b = rec("", "", "", "2015", "b");
        let ranked = rank(&[a, b], &prefs);
        assert_eq!(ranked[0].1.detail_url, "b");
        assert_eq!(ranked[0].0 - ranked[1].0, 50.0);
    }

    #[test]
    fn missing_attributes_contribute_zero() {
        let prefs = PreferenceVector {
            keys: vec![
                PreferenceKey::Mileage,
                PreferenceKey::Horsepower,
                PreferenceKey::DoorCount,
                PreferenceKey::Year,
            ],
            favorites: vec![],
        };
        assert_eq!(score(&CanonicalRecord::default(), &prefs), 0.0);
    }

    #[test]
    fn decimal_comma_horsepower_parses() {
        let prefs = PreferenceVector {
            keys: vec![PreferenceKey::Horsepower],
            favorites: vec![],
        };
        let r = rec("", "68,8 hp", "", "", "a");
        let s = score(&r, &prefs);
        assert!((s - 68.8 / 500.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_discovery_order() {
        let prefs = PreferenceVector::default();
        let a = rec("", "", "", "", "first");
        let b = rec("", "", "", "", "second");
        let ranked = rank(&[a, b], &prefs);
        assert_eq!(ranked[0].1.detail_url, "first");
        assert_eq!(ranked[1].1.detail_url, "second");
    }

    #[test]
    fn preference_key_parses_user_spellings() {
        assert_eq!(PreferenceKey::parse("Quilometragem"), Some(PreferenceKey::Mileage));
        assert_eq!(PreferenceKey::parse("ANO"), Some(PreferenceKey::Year));
        assert_eq!(PreferenceKey::parse("potência"), Some(PreferenceKey::Horsepower));
        assert_eq!(PreferenceKey::parse("cor"), None);
    }
}
