//! Shared text utilities: slugging, accent folding, number extraction.
//!
//! Marketplace labels arrive with mixed case, Portuguese diacritics and
//! thousands separators; everything that compares or matches text goes
//! through [`fold`] first so "Câmbio" and "cambio" are the same key.

/// Lowercase a string and strip combining diacritics.
///
/// Covers the Latin range that Brazilian marketplace markup actually uses;
/// anything outside it passes through unchanged.
pub fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Turn free text into a URL path slug: folded, alphanumerics and hyphens
/// only, runs of whitespace/hyphens collapsed to a single hyphen.
pub fn slugify(s: &str) -> String {
    let folded = fold(s);
    let mut slug = String::with_capacity(folded.len());
    let mut last_hyphen = true; // suppress leading hyphen
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if (c.is_whitespace() || c == '-') && !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// First run of ASCII digits in `s`, if any.
pub fn first_int(s: &str) -> Option<u64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Every ASCII digit in `s` concatenated and parsed — the "strip thousands
/// separators" reading of values like "34.200 km".
pub fn all_digits(s: &str) -> Option<u64> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_accents_and_case() {
        assert_eq!(fold("Câmbio"), "cambio");
        assert_eq!(fold("  Direção Hidráulica "), "direcao hidraulica");
        assert_eq!(fold("SALVAGE"), "salvage");
    }

    #[test]
    fn slugify_builds_path_segments() {
        assert_eq!(slugify("Belo Horizonte"), "belo-horizonte");
        assert_eq!(slugify("Sedã"), "seda");
        assert_eq!(slugify("  Off -- Road!! "), "off-road");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn number_extraction() {
        assert_eq!(first_int("4 portas"), Some(4));
        assert_eq!(first_int("portas: 2"), Some(2));
        assert_eq!(first_int("sim"), None);
        assert_eq!(all_digits("34.200 km"), Some(34200));
        assert_eq!(all_digits("R$ 19.990,00"), Some(1999000));
    }
}
