//! Filter Specification — the single input of a run.
//!
//! Deserialized from the flat JSON object the caller passes on invocation
//! (`{"cidade": "...", "anoMin": "2014", "portals": ["OLX"], ...}`).
//! Callers historically send numeric fields as either strings or numbers,
//! so every scalar field accepts both. The spec is immutable for the
//! duration of one run.

use serde::{Deserialize, Deserializer, Serialize};

use crate::text;

/// Accept a JSON string, number or bool and normalize it to `Option<String>`.
fn flexible<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flex {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    let v = Option::<Flex>::deserialize(de)?;
    Ok(v.and_then(|f| {
        let s = match f {
            Flex::Str(s) => s.trim().to_string(),
            Flex::Int(i) => i.to_string(),
            Flex::Float(x) => x.to_string(),
            Flex::Bool(b) => b.to_string(),
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }))
}

fn default_capture_details() -> bool {
    true
}

/// One run's worth of user constraints and transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    #[serde(deserialize_with = "flexible")]
    pub cidade: Option<String>,
    #[serde(rename = "cidadeUf", deserialize_with = "flexible")]
    pub cidade_uf: Option<String>,
    #[serde(rename = "cidadeMl", deserialize_with = "flexible")]
    pub cidade_ml: Option<String>,
    #[serde(rename = "anoMin", deserialize_with = "flexible")]
    pub ano_min: Option<String>,
    #[serde(rename = "anoMax", deserialize_with = "flexible")]
    pub ano_max: Option<String>,
    #[serde(rename = "precoMin", deserialize_with = "flexible")]
    pub preco_min: Option<String>,
    #[serde(rename = "precoMax", deserialize_with = "flexible")]
    pub preco_max: Option<String>,
    #[serde(rename = "kmMin", deserialize_with = "flexible")]
    pub km_min: Option<String>,
    #[serde(rename = "kmMax", deserialize_with = "flexible")]
    pub km_max: Option<String>,
    #[serde(deserialize_with = "flexible")]
    pub marca: Option<String>,
    #[serde(deserialize_with = "flexible")]
    pub modelo: Option<String>,
    #[serde(deserialize_with = "flexible")]
    pub carroceria: Option<String>,
    #[serde(deserialize_with = "flexible")]
    pub combustivel: Option<String>,
    #[serde(deserialize_with = "flexible")]
    pub portas: Option<String>,
    #[serde(deserialize_with = "flexible")]
    pub transmissao: Option<String>,
    #[serde(deserialize_with = "flexible")]
    pub cor: Option<String>,
    /// Enabled source names; empty means "all sources".
    pub portals: Vec<String>,
    #[serde(rename = "forbiddenWords")]
    pub forbidden_words: Vec<String>,
    /// Whether detail pages are fetched for each card.
    #[serde(default = "default_capture_details")]
    pub capture_details: bool,
    /// Remote-render service credential; presence selects the
    /// rendered-fetch acquisition strategy.
    #[serde(deserialize_with = "flexible")]
    pub zenrows_api_key: Option<String>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            cidade: None,
            cidade_uf: None,
            cidade_ml: None,
            ano_min: None,
            ano_max: None,
            preco_min: None,
            preco_max: None,
            km_min: None,
            km_max: None,
            marca: None,
            modelo: None,
            carroceria: None,
            combustivel: None,
            portas: None,
            transmissao: None,
            cor: None,
            portals: Vec::new(),
            forbidden_words: Vec::new(),
            capture_details: true,
            zenrows_api_key: None,
        }
    }
}

impl FilterSpec {
    /// Parse the invocation JSON. A malformed payload is an error the caller
    /// turns into an empty run — never a panic, never a partial run.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            anyhow::bail!("empty filter payload");
        }
        Ok(serde_json::from_str(raw)?)
    }

    /// Whether the named portal participates in this run.
    pub fn portal_enabled(&self, name: &str) -> bool {
        self.portals.is_empty() || self.portals.iter().any(|p| p == name)
    }

    /// The remote-render credential, also honoring the environment variable
    /// the desktop launcher exports.
    pub fn render_api_key(&self) -> Option<String> {
        self.zenrows_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("ZENROWS_API_KEY").ok().filter(|k| !k.is_empty()))
    }

    pub fn ano_min_num(&self) -> Option<u64> {
        self.ano_min.as_deref().and_then(text::all_digits)
    }

    pub fn ano_max_num(&self) -> Option<u64> {
        self.ano_max.as_deref().and_then(text::all_digits)
    }

    pub fn preco_min_num(&self) -> Option<u64> {
        self.preco_min.as_deref().and_then(text::all_digits)
    }

    pub fn preco_max_num(&self) -> Option<u64> {
        self.preco_max.as_deref().and_then(text::all_digits)
    }

    pub fn km_min_num(&self) -> Option<u64> {
        self.km_min.as_deref().and_then(text::all_digits)
    }

    pub fn km_max_num(&self) -> Option<u64> {
        self.km_max.as_deref().and_then(text::all_digits)
    }
}
