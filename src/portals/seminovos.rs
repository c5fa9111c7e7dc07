//! Seminovos: everything rides in path segments.
//!
//! Ranges encode as `ano-{min}-{max}` / `preco-{min}-{max}` / `km-{min}-{max}`
//! with either side optional, and the city travels as a numeric id the site
//! assigns (`cidade[]-2700` for Belo Horizonte) or a plain slug when the id
//! is unknown.
//!
//! The site has no body-type path segment; a `carroceria` filter is applied
//! by the shared traversal's local filters instead.

use crate::filters::FilterSpec;
use crate::text::slugify;

use super::{FieldSelectors, NextPage, Portal};

pub static PORTAL: Portal = Portal {
    name: "Seminovos",
    base: "https://seminovos.com.br",
    page_cap: 10,
    cards: &[".new-card", ".card", "[class*=\"vehicle-card\"]"],
    fields: FieldSelectors {
        title: &["h2", "h3", ".title"],
        price: &[".price", "[class*=\"price\"]"],
        location: &[".localizacao", ".location", ".cidade", "[class*=\"local\"]"],
        mileage: &[".details", "[class*=\"km\"]"],
        year: &["[class*=\"ano\"]", "[class*=\"year\"]"],
        image: &["img"],
    },
    build_url,
    accept_link,
    next_page: NextPage::Numbered,
};

fn accept_link(url: &str) -> bool {
    url.contains("seminovos.com.br") && !url.contains("seminovos.com.br/carro?")
}

/// Site-assigned numeric ids for the cities users actually search.
fn city_id(slug: &str) -> Option<u32> {
    match slug {
        "belo-horizonte" | "bh" => Some(2700),
        "betim" => Some(2707),
        "contagem" => Some(2922),
        "ibirite" => Some(3148),
        "joao-monlevade" => Some(3246),
        "nova-lima" => Some(3422),
        "sabara" => Some(3666),
        "santa-luzia" => Some(3691),
        _ => None,
    }
}

fn range_segment(prefix: &str, min: Option<u64>, max: Option<u64>) -> Option<String> {
    if min.is_none() && max.is_none() {
        return None;
    }
    let fmt = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();
    Some(format!("{prefix}-{}-{}", fmt(min), fmt(max)))
}

fn build_url(filters: &FilterSpec, page: usize) -> String {
    let mut parts: Vec<String> = vec!["carro".to_string()];

    let marca = slugify(filters.marca.as_deref().unwrap_or(""));
    if !marca.is_empty() {
        parts.push(marca);
    }
    let modelo = slugify(filters.modelo.as_deref().unwrap_or(""));
    if !modelo.is_empty() {
        parts.push(modelo);
    }

    if let Some(cidade) = filters.cidade.as_deref() {
        let slug = slugify(cidade);
        if !slug.is_empty() {
            match city_id(&slug) {
                Some(id) => parts.push(format!("cidade[]-{id}")),
                None => parts.push(format!("cidade-{slug}")),
            }
        }
    }

    if let Some(seg) = range_segment("ano", filters.ano_min_num(), filters.ano_max_num()) {
        parts.push(seg);
    }
    if let Some(seg) = range_segment("preco", filters.preco_min_num(), filters.preco_max_num()) {
        parts.push(seg);
    }
    if let Some(seg) = range_segment("km", filters.km_min_num(), filters.km_max_num()) {
        parts.push(seg);
    }

    let mut url = format!("https://seminovos.com.br/{}", parts.join("/"));
    if page > 1 {
        url.push_str(&format!("?page={page}"));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_is_the_bare_carro_path() {
        assert_eq!(build_url(&FilterSpec::default(), 1), "https://seminovos.com.br/carro");
    }

    #[test]
    fn known_city_uses_its_numeric_id() {
        let f = FilterSpec::from_json(r#"{"cidade":"Belo Horizonte","anoMin":"2015","anoMax":"2020"}"#)
            .unwrap();
        assert_eq!(
            build_url(&f, 1),
            "https://seminovos.com.br/carro/cidade[]-2700/ano-2015-2020"
        );
    }

    #[test]
    fn unknown_city_falls_back_to_slug() {
        let f = FilterSpec::from_json(r#"{"cidade":"Ouro Preto"}"#).unwrap();
        assert_eq!(
            build_url(&f, 1),
            "https://seminovos.com.br/carro/cidade-ouro-preto"
        );
    }

    #[test]
    fn half_open_ranges_keep_the_empty_side() {
        let f = FilterSpec::from_json(r#"{"marca":"Fiat","precoMax":"50000","kmMax":"60000"}"#)
            .unwrap();
        assert_eq!(
            build_url(&f, 2),
            "https://seminovos.com.br/carro/fiat/preco--50000/km--60000?page=2"
        );
    }
}
