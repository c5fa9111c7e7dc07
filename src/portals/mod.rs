//! Source adapters for the six marketplaces.
//!
//! Each portal module contributes one [`Portal`] value: its URL grammar,
//! ordered fallback selectors for cards and card fields, a detail-link
//! predicate and a pagination policy. All traversal behavior lives in
//! [`traversal`]; the per-portal modules are pure configuration plus a URL
//! builder, so a markup change on one site is a one-file fix.

use crate::filters::FilterSpec;

pub mod localiza;
pub mod mercado_livre;
pub mod olx;
pub mod seminovos;
pub mod traversal;
pub mod unidas;
pub mod webmotors;

/// Ordered fallback selectors for the fields a listing card exposes.
/// Earlier selectors are the current markup; later ones are older layouts
/// that still appear on some pages.
pub struct FieldSelectors {
    pub title: &'static [&'static str],
    pub price: &'static [&'static str],
    pub location: &'static [&'static str],
    pub mileage: &'static [&'static str],
    pub year: &'static [&'static str],
    pub image: &'static [&'static str],
}

/// How a portal advances to the next listing page.
pub enum NextPage {
    /// Rebuild the listing URL with the next page number.
    Numbered,
    /// Follow the page's own next link; when absent, advance the
    /// `_Desde_{offset}` path segment by `page_size`.
    LinkThenOffset { page_size: usize },
}

/// One marketplace's configuration.
pub struct Portal {
    pub name: &'static str,
    /// Base URL for resolving relative detail links.
    pub base: &'static str,
    /// Hard page cap; the zero-new-links and repeated-URL guards usually
    /// stop a run well before it.
    pub page_cap: usize,
    pub cards: &'static [&'static str],
    pub fields: FieldSelectors,
    /// Listing URL for a 1-based page number.
    pub build_url: fn(&FilterSpec, usize) -> String,
    /// Whether an anchor href (already resolved) is a detail link.
    pub accept_link: fn(&str) -> bool,
    pub next_page: NextPage,
}

/// All portals in their fixed run order.
pub fn registry() -> [&'static Portal; 6] {
    [
        &olx::PORTAL,
        &webmotors::PORTAL,
        &mercado_livre::PORTAL,
        &seminovos::PORTAL,
        &localiza::PORTAL,
        &unidas::PORTAL,
    ]
}

/// Percent-encode a query value (RFC 3986 unreserved set kept literal).
pub(crate) fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_is_fixed() {
        let names: Vec<&str> = registry().iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            ["OLX", "Webmotors", "Mercado Livre", "Seminovos", "Localiza", "Unidas"]
        );
    }

    #[test]
    fn percent_encoding_covers_utf8() {
        assert_eq!(percent_encode("Minas Gerais"), "Minas%20Gerais");
        assert_eq!(percent_encode("São Paulo"), "S%C3%A3o%20Paulo");
        assert_eq!(percent_encode("abc-123.x~_"), "abc-123.x~_");
    }
}
