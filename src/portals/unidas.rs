//! Unidas Seminovos: filters as named path parts, fixed grid query.
//!
//! Numeric bounds travel as `valorini-`/`valorfim-`, `kmini-`/`kmfim-` and
//! `anoini-`/`anofim-` path segments, in that order, before brand/model.
//! A year floor without a ceiling mirrors into `anofim` — the site treats a
//! lone `anoini` as an exact-year filter.

use crate::filters::FilterSpec;
use crate::text::slugify;

use super::{FieldSelectors, NextPage, Portal};

pub static PORTAL: Portal = Portal {
    name: "Unidas",
    base: "https://seminovos.unidas.com.br",
    page_cap: 40,
    cards: &[".new-card", ".card", "[class*=\"vehicle-card\"]"],
    fields: FieldSelectors {
        title: &["h2", "h3", ".title", "[class*=\"model\"]"],
        price: &[".price", "[class*=\"price\"]"],
        location: &["[class*=\"local\"]", ".details li"],
        mileage: &["[class*=\"km\"]", ".details li"],
        year: &["[class*=\"year\"]", "[class*=\"ano\"]"],
        image: &["img"],
    },
    build_url,
    accept_link,
    next_page: NextPage::Numbered,
};

fn accept_link(url: &str) -> bool {
    url.contains("seminovos.unidas.com.br") && url.contains("/veiculo")
}

/// Cities with a compound segment the site's router expects.
fn city_segment(slug: &str) -> Option<String> {
    match slug {
        // The default region needs no segment at all.
        "belo-horizonte" | "bh" => None,
        "contagem" | "contagem-mg" => Some("contagem-contagem-mg".to_string()),
        "betim" | "betim-mg" => Some("betim-betim-mg".to_string()),
        other => Some(other.to_string()),
    }
}

fn build_url(filters: &FilterSpec, page: usize) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(v) = filters.preco_min_num() {
        parts.push(format!("valorini-{v}"));
    }
    if let Some(v) = filters.preco_max_num() {
        parts.push(format!("valorfim-{v}"));
    }
    if let Some(v) = filters.km_min_num() {
        parts.push(format!("kmini-{v}"));
    }
    if let Some(v) = filters.km_max_num() {
        parts.push(format!("kmfim-{v}"));
    }
    let ano_min = filters.ano_min_num();
    let ano_max = filters.ano_max_num().or(ano_min);
    if let Some(v) = ano_min {
        parts.push(format!("anoini-{v}"));
    }
    if let Some(v) = ano_max {
        parts.push(format!("anofim-{v}"));
    }

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
            if let Some(seg) = city_segment(&slug) {
                parts.push(seg);
            }
        }
    }

    let carroceria = slugify(filters.carroceria.as_deref().unwrap_or(""));
    if !carroceria.is_empty() {
        parts.push(format!("categoria-{carroceria}"));
    }

    let base = if parts.is_empty() {
        "https://seminovos.unidas.com.br/veiculos".to_string()
    } else {
        format!("https://seminovos.unidas.com.br/veiculos/{}", parts.join("/"))
    };

    format!("{base}?page={page}&perpage=24&order=destaque:desc&layout=grid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_keeps_the_fixed_grid_query() {
        assert_eq!(
            build_url(&FilterSpec::default(), 1),
            "https://seminovos.unidas.com.br/veiculos?page=1&perpage=24&order=destaque:desc&layout=grid"
        );
    }

    #[test]
    fn bounds_precede_brand_and_model() {
        let f = FilterSpec::from_json(
            r#"{"marca":"Fiat","modelo":"Toro","precoMin":"40000","precoMax":"90000","kmMax":"70000","anoMin":"2019","anoMax":"2022"}"#,
        )
        .unwrap();
        let url = build_url(&f, 2);
        assert!(url.contains(
            "/veiculos/valorini-40000/valorfim-90000/kmfim-70000/anoini-2019/anofim-2022/fiat/toro?page=2&"
        ));
    }

    #[test]
    fn lone_year_floor_mirrors_into_the_ceiling() {
        let f = FilterSpec::from_json(r#"{"anoMin":"2020"}"#).unwrap();
        assert!(build_url(&f, 1).contains("/anoini-2020/anofim-2020?"));
    }

    #[test]
    fn mapped_cities_use_compound_segments() {
        let f = FilterSpec::from_json(r#"{"cidade":"Contagem"}"#).unwrap();
        assert!(build_url(&f, 1).contains("/veiculos/contagem-contagem-mg?"));

        let bh = FilterSpec::from_json(r#"{"cidade":"Belo Horizonte"}"#).unwrap();
        assert!(build_url(&bh, 1).contains("/veiculos?page=1"));
    }
}
