//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_ELASTICSEARCH__HOST`). Provides
//! helpers to expand `~` and `${VAR}` in configured paths.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fusion::{FusionWeights, DEFAULT_TEXT_WEIGHT, DEFAULT_VECTOR_WEIGHT};
use crate::types::{DEFAULT_MAX_CONTEXT, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same layering as [`Config::load`], with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if matches!(env, "prod" | "production") {
            let settings = self.settings()?;
            if settings.embedding.fake {
                anyhow::bail!("fake embeddings are not allowed in production");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub elasticsearch: ElasticSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
    pub backend: BackendSettings,
    pub data: DataSettings,
    pub log: LogSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if self.search.text_weight < 0.0 || self.search.vector_weight < 0.0 {
            return Err(Error::InvalidConfig("search weights must not be negative".into()));
        }
        if self.search.candidate_factor == 0 {
            return Err(Error::InvalidConfig("search.candidate_factor must be at least 1".into()));
        }
        if self.elasticsearch.index.trim().is_empty() {
            return Err(Error::InvalidConfig("elasticsearch.index must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticSettings {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub index: String,
    pub timeout_ms: u64,
    pub verify_certs: bool,
}

impl Default for ElasticSettings {
    fn default() -> Self {
        Self {
            scheme: "http".into(),
            host: "localhost".into(),
            port: 9200,
            username: None,
            password: None,
            index: "vector_rag_documents".into(),
            timeout_ms: 30_000,
            verify_certs: false,
        }
    }
}

impl ElasticSettings {
    /// Base URL without credentials; those travel as basic auth.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_name: String,
    pub model_dir: Option<String>,
    pub dimension: usize,
    pub max_len: usize,
    pub fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2".into(),
            model_dir: None,
            dimension: 384,
            max_len: 256,
            fake: false,
        }
    }
}

impl EmbeddingSettings {
    pub fn model_path(&self) -> Option<PathBuf> {
        self.model_dir.as_deref().map(expand_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_max_results: usize,
    pub default_min_score: f32,
    pub default_max_context: usize,
    pub text_weight: f32,
    pub vector_weight: f32,
    pub candidate_factor: usize,
    pub request_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_max_results: DEFAULT_MAX_RESULTS,
            default_min_score: DEFAULT_MIN_SCORE,
            default_max_context: DEFAULT_MAX_CONTEXT,
            text_weight: DEFAULT_TEXT_WEIGHT,
            vector_weight: DEFAULT_VECTOR_WEIGHT,
            candidate_factor: 2,
            request_timeout_ms: 10_000,
        }
    }
}

impl SearchSettings {
    pub fn weights(&self) -> FusionWeights {
        FusionWeights::new(self.text_weight, self.vector_weight)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Elastic,
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub documents_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { documents_dir: "sample_data".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

/// Expands `~` and `$VAR`/`${VAR}` in a configured path. No canonicalization;
/// unknown variables leave the input untouched.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_env = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}

/// Expanded `p`, joined onto `base` unless it is already absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let path = expand_path(p);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
