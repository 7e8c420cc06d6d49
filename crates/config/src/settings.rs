use std::fs;
use std::path::{Path, PathBuf};

use mediarecon_recon::gateway::{COMMONS_API, MAX_BATCH_SIZE, WIKIDATA_API};
use mediarecon_recon::model::is_language_code;
use mediarecon_recon::preview::{DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH};
use mediarecon_recon::suggest::DEFAULT_PROPOSED_PROPERTIES;
use mediarecon_recon::{Endpoints, PreviewSize, ReconcilerOptions};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Overrides the config file location when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "MEDIARECON_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Media repository API.
    pub commons_api: String,
    /// Knowledge-graph API.
    pub wikidata_api: String,
    /// Public base URL of this service, used in the manifest.
    pub service_url: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            commons_api: COMMONS_API.to_string(),
            wikidata_api: WIKIDATA_API.to_string(),
            service_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub default_lang: String,
    /// Ids per entity lookup call.
    pub batch_size: usize,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self { default_lang: "en".to_string(), batch_size: MAX_BATCH_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSection {
    pub width: u32,
    pub height: u32,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self { width: DEFAULT_PREVIEW_WIDTH, height: DEFAULT_PREVIEW_HEIGHT }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// `None` uses the transport's built-in user agent.
    pub user_agent: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self { timeout_secs: 30, max_retries: 0, user_agent: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalSection {
    pub properties: Vec<String>,
}

impl Default for ProposalSection {
    fn default() -> Self {
        Self { properties: DEFAULT_PROPOSED_PROPERTIES.iter().map(|p| p.to_string()).collect() }
    }
}

/// Top-level service configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoints: EndpointSettings,
    pub service: ServiceSection,
    pub preview: PreviewSection,
    pub http: HttpSection,
    pub proposals: ProposalSection,
}

impl ServiceConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("endpoints.commons_api", &self.endpoints.commons_api),
            ("endpoints.wikidata_api", &self.endpoints.wikidata_api),
            ("endpoints.service_url", &self.endpoints.service_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{} must be an http(s) URL, got {:?}",
                    name, url
                )));
            }
        }

        if !(1..=MAX_BATCH_SIZE).contains(&self.service.batch_size) {
            return Err(ConfigError::Validation(format!(
                "service.batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.service.batch_size
            )));
        }

        if !is_language_code(&self.service.default_lang) {
            return Err(ConfigError::Validation(format!(
                "service.default_lang is not a language code: {:?}",
                self.service.default_lang
            )));
        }

        if self.preview.width == 0 || self.preview.height == 0 {
            return Err(ConfigError::Validation("preview width and height must be non-zero".into()));
        }

        if self.proposals.properties.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation("proposals.properties contains an empty id".into()));
        }

        Ok(())
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mediarecon").join("config.toml"))
    }

    /// Load from `path`, else from the default location if a file exists
    /// there, else built-in defaults. Returns the file actually read.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => return Ok((Self::default(), None)),
            },
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml(&contents)?;
        Ok((config, Some(path)))
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            commons_api: self.endpoints.commons_api.clone(),
            wikidata_api: self.endpoints.wikidata_api.clone(),
        }
    }

    pub fn reconciler_options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            default_lang: self.service.default_lang.clone(),
            preview: PreviewSize { width: self.preview.width, height: self.preview.height },
            proposed_properties: self.proposals.properties.clone(),
        }
    }
}
