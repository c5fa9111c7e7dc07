//! Mercado Livre: slug-and-suffix URL grammar with offset pagination.
//!
//! Filters ride in underscore-delimited path suffixes (`_PriceRange_`,
//! `_KILOMETERS_`, `_YearRange_`, `_VEHICLE*BODY*TYPE_` with the site's
//! opaque body-type codes). `_NoIndex_True` must close the suffix chain or
//! the site redirects to a category landing page. Pagination follows the
//! page's own next link when one exists, else computes `_Desde_{offset}`.

use crate::filters::FilterSpec;
use crate::text::{fold, slugify};

use super::{FieldSelectors, NextPage, Portal};

pub static PORTAL: Portal = Portal {
    name: "Mercado Livre",
    base: "https://lista.mercadolivre.com.br",
    page_cap: 50,
    cards: &[
        ".ui-search-result__wrapper",
        ".ui-search-result",
        ".ui-search-item",
    ],
    fields: FieldSelectors {
        title: &[".ui-search-item__title", ".ui-search-item__title-label", "h2"],
        price: &[".andes-money-amount__fraction", ".ui-search-price__second-line"],
        location: &[".ui-search-item__location", ".ui-search-item__group--location"],
        // Card attribute list order is year first, mileage second.
        mileage: &[".ui-search-card-attributes__attribute:nth-of-type(2)"],
        year: &[".ui-search-card-attributes__attribute:nth-of-type(1)"],
        image: &[".ui-search-result__image img", "picture img", "img"],
    },
    build_url,
    accept_link,
    next_page: NextPage::LinkThenOffset { page_size: 48 },
};

fn accept_link(url: &str) -> bool {
    url.contains("mercadolivre.com.br") && url.contains("MLB")
}

/// Site-assigned body-type filter codes, keyed by folded user input.
fn body_type_code(raw: &str) -> Option<&'static str> {
    match fold(raw).as_str() {
        "hatch" => Some("479344"),
        "seda" | "sedan" => Some("452758"),
        "suv" => Some("452759"),
        "pick-up" | "pickup" | "pick up" => Some("452756"),
        "minivan" => Some("452753"),
        "monovolume" => Some("452752"),
        "furgao" => Some("452750"),
        "van" => Some("452755"),
        "off-road" | "off road" => Some("452754"),
        _ => None,
    }
}

fn build_url(filters: &FilterSpec, _page: usize) -> String {
    let localizacao = slugify(
        filters
            .cidade_ml
            .as_deref()
            .or(filters.cidade.as_deref())
            .unwrap_or("belo-horizonte-minas-gerais"),
    );
    let marca = slugify(filters.marca.as_deref().unwrap_or(""));
    let modelo = slugify(filters.modelo.as_deref().unwrap_or(""));

    let mut url = String::from("https://lista.mercadolivre.com.br/");
    if !marca.is_empty() && !modelo.is_empty() {
        url.push_str(&format!("carros-caminhonetes/{marca}/{modelo}-em-{localizacao}/"));
    } else if !modelo.is_empty() {
        url.push_str(&format!("{modelo}-em-{localizacao}/"));
    } else if !marca.is_empty() {
        url.push_str(&format!("carros-caminhonetes/{marca}-em-{localizacao}/"));
    } else if !localizacao.is_empty() {
        url.push_str(&format!("carros-caminhonetes-em-{localizacao}/"));
    } else {
        url.push_str("carros-caminhonetes/");
    }

    let mut suffixes: Vec<String> = Vec::new();

    let preco_min = filters.preco_min_num();
    let preco_max = filters.preco_max_num();
    if preco_min.is_some() || preco_max.is_some() {
        let lo = preco_min.unwrap_or(0);
        let hi = preco_max.unwrap_or(lo);
        let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
        suffixes.push(format!("_PriceRange_{lo}-{hi}"));
    }

    let km_min = filters.km_min_num();
    let km_max = filters.km_max_num();
    if km_min.is_some() || km_max.is_some() {
        let lo = km_min.unwrap_or(0);
        let hi = km_max.unwrap_or(999_999);
        let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
        suffixes.push(format!("_KILOMETERS_{lo}km-{hi}km"));
    }

    if let Some(ano) = filters.ano_min_num() {
        suffixes.push(format!("_YearRange_{ano}-0"));
    }

    if let Some(code) = filters.carroceria.as_deref().and_then(body_type_code) {
        suffixes.push(format!("_VEHICLE*BODY*TYPE_{code}"));
    }

    // Suffix chains without NoIndex bounce to a category landing page.
    if !suffixes.is_empty() {
        suffixes.push("_NoIndex_True".to_string());
    }

    format!("{url}{}?new_categories_landing=false", suffixes.concat())
}

/// Advance the `_Desde_{offset}` segment by one page worth of items,
/// preserving any query string.
pub fn next_offset_url(current: &str, page_size: usize) -> String {
    let (path, query) = match current.split_once('?') {
        Some((p, q)) => (p.to_string(), format!("?{q}")),
        None => (current.to_string(), String::new()),
    };

    let advanced = match path.find("_Desde_") {
        Some(pos) => {
            let digits_start = pos + "_Desde_".len();
            let digits_end = path[digits_start..]
                .find(|c: char| !c.is_ascii_digit())
                .map(|i| digits_start + i)
                .unwrap_or(path.len());
            let offset: usize = path[digits_start..digits_end].parse().unwrap_or(0);
            format!(
                "{}_Desde_{}{}",
                &path[..pos],
                offset + page_size,
                &path[digits_end..]
            )
        }
        None => format!("{path}_Desde_{}", page_size + 1),
    };

    format!("{advanced}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_targets_the_default_city() {
        let url = build_url(&FilterSpec::default(), 1);
        assert_eq!(
            url,
            "https://lista.mercadolivre.com.br/carros-caminhonetes-em-belo-horizonte-minas-gerais/?new_categories_landing=false"
        );
    }

    #[test]
    fn filter_suffixes_chain_and_close_with_noindex() {
        let f = FilterSpec::from_json(
            r#"{"marca":"Fiat","modelo":"Argo","precoMin":"30000","precoMax":"60000","kmMax":"80000","anoMin":"2018","carroceria":"Hatch"}"#,
        )
        .unwrap();
        let url = build_url(&f, 1);
        assert!(url.contains("/carros-caminhonetes/fiat/argo-em-belo-horizonte-minas-gerais/"));
        assert!(url.contains("_PriceRange_30000-60000"));
        assert!(url.contains("_KILOMETERS_0km-80000km"));
        assert!(url.contains("_YearRange_2018-0"));
        assert!(url.contains("_VEHICLE*BODY*TYPE_479344"));
        assert!(url.contains("_NoIndex_True?new_categories_landing=false"));
    }

    #[test]
    fn inverted_price_bounds_are_swapped() {
        let f = FilterSpec::from_json(r#"{"precoMin":"60000","precoMax":"30000"}"#).unwrap();
        assert!(build_url(&f, 1).contains("_PriceRange_30000-60000"));
    }

    #[test]
    fn offset_pagination_inserts_then_advances() {
        let first = "https://lista.mercadolivre.com.br/carros-em-bh/_NoIndex_True?x=1";
        let second = next_offset_url(first, 48);
        assert_eq!(
            second,
            "https://lista.mercadolivre.com.br/carros-em-bh/_NoIndex_True_Desde_49?x=1"
        );
        let third = next_offset_url(&second, 48);
        assert_eq!(
            third,
            "https://lista.mercadolivre.com.br/carros-em-bh/_NoIndex_True_Desde_97?x=1"
        );
    }

    #[test]
    fn body_codes_fold_accents() {
        assert_eq!(body_type_code("Sedã"), Some("452758"));
        assert_eq!(body_type_code("PICK-UP"), Some("452756"));
        assert_eq!(body_type_code("conversível"), None);
    }
}
