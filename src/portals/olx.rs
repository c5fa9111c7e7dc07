//! OLX: slug-path taxonomy plus short query-parameter ranges.
//!
//! Path order matters to OLX's router: brand, then model, then body type,
//! then the fixed state/region segments. Numeric ranges travel as paired
//! query params (`ps`/`pe` price, `rs`/`re` model year, `mi`/`me` mileage).

use crate::filters::FilterSpec;
use crate::text::slugify;

use super::{FieldSelectors, NextPage, Portal};

pub static PORTAL: Portal = Portal {
    name: "OLX",
    base: "https://www.olx.com.br",
    page_cap: 5,
    cards: &[
        "section.olx-adcard",
        "li[data-lurker-listitemid]",
        "a[data-testid=\"ad-card\"]",
    ],
    fields: FieldSelectors {
        title: &[".olx-adcard__title", "h2"],
        price: &[".olx-adcard__price", "[data-testid=\"ad-price\"]"],
        location: &[".olx-adcard__location", "[data-testid=\"ad-location\"]"],
        mileage: &[".olx-adcard__detail"],
        year: &[".olx-adcard__detail:nth-of-type(2)"],
        image: &["img"],
    },
    build_url,
    accept_link,
    next_page: NextPage::Numbered,
};

fn accept_link(url: &str) -> bool {
    url.contains("olx.com.br") && (url.contains("/autos-e-pecas/") || url.contains("/anuncio/"))
}

fn build_url(filters: &FilterSpec, page: usize) -> String {
    let cidade = slugify(filters.cidade.as_deref().unwrap_or("belo-horizonte"));
    let sub_cidade = if !cidade.is_empty() && cidade != "belo-horizonte" {
        format!("/grande-belo-horizonte/{cidade}")
    } else {
        String::new()
    };

    let marca = slugify(filters.marca.as_deref().unwrap_or(""));
    let modelo = slugify(filters.modelo.as_deref().unwrap_or(""));
    let carroceria = slugify(filters.carroceria.as_deref().unwrap_or(""));

    let mut taxonomy = String::new();
    if !marca.is_empty() {
        taxonomy.push_str(&format!("/{marca}"));
        if !modelo.is_empty() {
            taxonomy.push_str(&format!("/{modelo}"));
        }
        if !carroceria.is_empty() {
            taxonomy.push_str(&format!("/{carroceria}"));
        }
    } else if !carroceria.is_empty() {
        taxonomy.push_str(&format!("/{carroceria}"));
    }

    let mut params: Vec<String> = Vec::new();
    if let Some(v) = filters.preco_min_num() {
        params.push(format!("ps={v}"));
    }
    if let Some(v) = filters.preco_max_num() {
        params.push(format!("pe={v}"));
    }
    if let Some(v) = filters.ano_min_num() {
        params.push(format!("rs={v}"));
    }
    if let Some(v) = filters.ano_max_num() {
        params.push(format!("re={v}"));
    }
    if let Some(v) = filters.km_min_num() {
        params.push(format!("mi={v}"));
    }
    if let Some(v) = filters.km_max_num() {
        params.push(format!("me={v}"));
    }
    params.push(format!("page={page}"));

    format!(
        "https://www.olx.com.br/autos-e-pecas/carros-vans-e-utilitarios{taxonomy}/estado-mg/belo-horizonte-e-regiao{sub_cidade}?{}",
        params.join("&")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_targets_the_bh_region() {
        let url = build_url(&FilterSpec::default(), 1);
        assert_eq!(
            url,
            "https://www.olx.com.br/autos-e-pecas/carros-vans-e-utilitarios/estado-mg/belo-horizonte-e-regiao?page=1"
        );
    }

    #[test]
    fn brand_model_body_order_in_path() {
        let f = FilterSpec::from_json(
            r#"{"marca":"Fiat","modelo":"Argo","carroceria":"Hatch","anoMin":"2018","precoMax":"60000"}"#,
        )
        .unwrap();
        let url = build_url(&f, 2);
        assert!(url.contains("/carros-vans-e-utilitarios/fiat/argo/hatch/estado-mg/"));
        assert!(url.contains("pe=60000"));
        assert!(url.contains("rs=2018"));
        assert!(url.ends_with("page=2"));
    }

    #[test]
    fn other_cities_nest_under_the_metro_region() {
        let f = FilterSpec::from_json(r#"{"cidade":"Contagem"}"#).unwrap();
        let url = build_url(&f, 1);
        assert!(url.contains("belo-horizonte-e-regiao/grande-belo-horizonte/contagem?"));
    }

    #[test]
    fn detail_links_stay_inside_the_vehicle_section() {
        assert!(accept_link(
            "https://www.olx.com.br/autos-e-pecas/carros-vans-e-utilitarios/fiat-argo-123"
        ));
        assert!(!accept_link("https://www.olx.com.br/imoveis/casa-456"));
        assert!(!accept_link("https://example.com/autos-e-pecas/x"));
    }
}
