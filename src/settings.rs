use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings read from `Config.toml`, overridable through `HAYY__SECTION__KEY`
/// environment variables. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub neighborhoods_file: String,
    /// JSON lines, one case per line.
    pub cases_file: String,
    /// Holds `schools.json`, `hospitals.json`, `parks.json`,
    /// `supermarkets.json` and `malls.json`.
    pub facilities_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            neighborhoods_file: "data/neighborhoods.json".into(),
            cases_file: "data/cases.jsonl".into(),
            facilities_dir: "data/facilities".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub history_limit: usize,
    /// Turns inspected when resolving follow-ups and references.
    pub context_window: usize,
    pub default_neighborhood: String,
    pub budget_sample_size: usize,
    pub similarity_timeout_ms: u64,
    pub similarity_top_k: usize,
    pub min_similarity: f32,
    /// Used when the store lists no neighborhoods at all.
    pub fallback_neighborhoods: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_limit: 50,
            context_window: 3,
            default_neighborhood: "الياسمين".into(),
            budget_sample_size: 3,
            similarity_timeout_ms: 2000,
            similarity_top_k: 5,
            min_similarity: 0.05,
            fallback_neighborhoods: [
                "النرجس", "الياسمين", "الملقا", "حطين", "الوادي", "الازدهار", "الربيع", "الرائد",
                "العقيق", "المروج", "النخيل", "الصحافة",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Settings {
    /// Loads `name` (extension optional) plus environment overrides. A
    /// missing file leaves every value at its default.
    pub fn load(name: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(
                config::Environment::with_prefix("HAYY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading configuration {}", name))?
            .try_deserialize()
            .context("invalid configuration")
    }
}
