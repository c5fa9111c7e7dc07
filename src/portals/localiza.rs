//! Localiza Seminovos: simple paged query-parameter grammar.

use crate::filters::FilterSpec;
use crate::text::slugify;

use super::{FieldSelectors, NextPage, Portal};

pub static PORTAL: Portal = Portal {
    name: "Localiza",
    base: "https://seminovos.localiza.com",
    page_cap: 20,
    cards: &["[data-testid=\"product-card-standard\"]", ".product-card"],
    fields: FieldSelectors {
        title: &["h2", "[data-testid=\"product-card-title\"]", ".name-vehicle", ".title"],
        price: &["[data-testid=\"product-card-price\"]", "[class*=\"price\"]"],
        location: &["[data-testid=\"product-card-location\"]", "[class*=\"local\"]"],
        mileage: &[".mui-rsig1c", "[class*=\"km\"]", "li"],
        year: &["[class*=\"year\"]", "[class*=\"ano\"]"],
        image: &["img"],
    },
    build_url,
    accept_link,
    next_page: NextPage::Numbered,
};

fn accept_link(url: &str) -> bool {
    url.contains("seminovos.localiza.com") && url.contains("/carro")
}

fn build_url(filters: &FilterSpec, page: usize) -> String {
    let cidade_uf = slugify(filters.cidade_uf.as_deref().unwrap_or("mg-belo-horizonte"));

    let marca = slugify(filters.marca.as_deref().unwrap_or(""));
    let modelo = slugify(filters.modelo.as_deref().unwrap_or(""));
    let mut path_suffix = String::new();
    if !marca.is_empty() {
        path_suffix.push_str(&format!("/{marca}"));
        if !modelo.is_empty() {
            path_suffix.push_str(&format!("/{modelo}"));
        }
    }

    let mut extra: Vec<String> = Vec::new();
    if let Some(v) = filters.ano_min_num() {
        extra.push(format!("anoDe={v}"));
    }
    if let Some(v) = filters.ano_max_num() {
        extra.push(format!("anoAte={v}"));
    }
    if let Some(v) = filters.preco_min_num() {
        extra.push(format!("PrecoDe={v}"));
    }
    if let Some(v) = filters.preco_max_num() {
        extra.push(format!("PrecoAte={v}"));
    }
    if let Some(c) = &filters.carroceria {
        let slug = slugify(c);
        if !slug.is_empty() {
            extra.push(format!("categorias={slug}"));
        }
    }
    if let Some(v) = filters.km_max_num() {
        extra.push(format!("kmAte={v}"));
    }

    let q = if extra.is_empty() {
        String::new()
    } else {
        format!("&{}", extra.join("&"))
    };

    format!("https://seminovos.localiza.com/carros/{cidade_uf}{path_suffix}?page={page}{q}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_pages_the_default_city() {
        assert_eq!(
            build_url(&FilterSpec::default(), 4),
            "https://seminovos.localiza.com/carros/mg-belo-horizonte?page=4"
        );
    }

    #[test]
    fn filters_append_after_the_page_param() {
        let f = FilterSpec::from_json(
            r#"{"cidadeUf":"sp-campinas","marca":"Chevrolet","modelo":"Onix","anoMin":"2019","precoMax":"75000","kmMax":"50000"}"#,
        )
        .unwrap();
        let url = build_url(&f, 1);
        assert!(url.starts_with("https://seminovos.localiza.com/carros/sp-campinas/chevrolet/onix?page=1&"));
        assert!(url.contains("anoDe=2019"));
        assert!(url.contains("PrecoAte=75000"));
        assert!(url.contains("kmAte=50000"));
    }
}
