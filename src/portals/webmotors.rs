//! Webmotors: state/city path segment plus a verbose query string.
//!
//! The path carries the location (`/carros/mg` or `/carros/mg-contagem`)
//! and optional brand/model; the filters repeat in query parameters the
//! site's frontend expects (`estadocidade` spelled out as "Minas
//! Gerais-Contagem", `anode`, `precoate`, `kmate`).

use crate::filters::FilterSpec;
use crate::text::slugify;

use super::{percent_encode, FieldSelectors, NextPage, Portal};

pub static PORTAL: Portal = Portal {
    name: "Webmotors",
    base: "https://www.webmotors.com.br",
    page_cap: 50,
    cards: &[
        "[data-testid=\"vehicle_card_oem_container\"]",
        "div[class*=\"_Card_\"]",
    ],
    fields: FieldSelectors {
        title: &["h2", "[data-testid=\"vehicle_card_oem_title\"]"],
        price: &["[data-testid=\"vehicle_card_oem_price\"]", "[class*=\"Price\"]"],
        location: &["[data-testid=\"vehicle_card_oem_location\"]"],
        mileage: &["[data-testid=\"vehicle_card_oem_km\"]", "[class*=\"Km\"]"],
        year: &["[data-testid=\"vehicle_card_oem_year\"]"],
        image: &["img"],
    },
    build_url,
    accept_link,
    next_page: NextPage::Numbered,
};

fn accept_link(url: &str) -> bool {
    url.contains("webmotors.com.br") && url.contains("/comprar/")
}

fn uf_to_state_name(uf: &str) -> String {
    match uf {
        "mg" => "Minas Gerais".to_string(),
        "sp" => "São Paulo".to_string(),
        "rj" => "Rio de Janeiro".to_string(),
        "es" => "Espírito Santo".to_string(),
        "pr" => "Paraná".to_string(),
        other => other.to_uppercase(),
    }
}

fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_url(filters: &FilterSpec, page: usize) -> String {
    // "mg-belo-horizonte" → uf "mg", city "belo-horizonte".
    let cidade_uf = slugify(filters.cidade_uf.as_deref().unwrap_or("mg-belo-horizonte"));
    let (uf, city) = match cidade_uf.split_once('-') {
        Some((uf, city)) => (uf.to_string(), city.to_string()),
        None => (cidade_uf.clone(), String::new()),
    };
    let cidade_path = if !city.is_empty() && city != "belo-horizonte" {
        format!("{uf}-{city}")
    } else {
        uf.clone()
    };

    let marca = slugify(filters.marca.as_deref().unwrap_or(""));
    let modelo = slugify(filters.modelo.as_deref().unwrap_or(""));
    let mut path = format!("https://www.webmotors.com.br/carros/{cidade_path}");
    if !marca.is_empty() {
        path.push_str(&format!("/{marca}"));
        if !modelo.is_empty() {
            path.push_str(&format!("/{modelo}"));
        }
    }
    if let Some(ano) = filters.ano_min_num() {
        path.push_str(&format!("/de.{ano}"));
    }

    let state_name = uf_to_state_name(&uf);
    let estadocidade = if cidade_path.contains('-') {
        format!("{state_name}-{}", title_case(&city))
    } else {
        state_name
    };

    let mut params = vec![
        "lkid=1022".to_string(),
        "tipoveiculo=carros".to_string(),
        format!("estadocidade={}", percent_encode(&estadocidade)),
    ];
    if let Some(v) = filters.ano_min_num() {
        params.push(format!("anode={v}"));
    }
    if let Some(v) = filters.preco_max_num() {
        params.push(format!("precoate={v}"));
    }
    if let Some(v) = filters.km_max_num() {
        params.push(format!("kmate={v}"));
    }
    if let Some(c) = &filters.carroceria {
        params.push(format!("carroceria={}", slugify(c)));
    }
    if !marca.is_empty() {
        params.push(format!("marca1={}", marca.to_uppercase()));
    }
    if !modelo.is_empty() {
        params.push(format!("modelo1={}", modelo.to_uppercase()));
    }
    params.push(format!("page={page}"));

    format!("{path}?{}", params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_only_location_uses_the_uf_segment() {
        let url = build_url(&FilterSpec::default(), 1);
        assert!(url.starts_with("https://www.webmotors.com.br/carros/mg?"));
        assert!(url.contains("estadocidade=Minas%20Gerais"));
        assert!(url.ends_with("page=1"));
    }

    #[test]
    fn city_location_expands_both_path_and_query() {
        let f = FilterSpec::from_json(r#"{"cidadeUf":"mg-contagem"}"#).unwrap();
        let url = build_url(&f, 3);
        assert!(url.contains("/carros/mg-contagem?"));
        assert!(url.contains("estadocidade=Minas%20Gerais-Contagem"));
        assert!(url.ends_with("page=3"));
    }

    #[test]
    fn year_floor_appears_in_path_and_query() {
        let f = FilterSpec::from_json(
            r#"{"marca":"Honda","modelo":"Civic","anoMin":2016,"precoMax":90000,"kmMax":"80.000"}"#,
        )
        .unwrap();
        let url = build_url(&f, 1);
        assert!(url.contains("/carros/mg/honda/civic/de.2016?"));
        assert!(url.contains("anode=2016"));
        assert!(url.contains("precoate=90000"));
        assert!(url.contains("kmate=80000"));
        assert!(url.contains("marca1=HONDA"));
        assert!(url.contains("modelo1=CIVIC"));
    }
}
