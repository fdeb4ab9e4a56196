use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::derivation::DerivationEngine;
use crate::domain::rule::{CategoryRule, RuleTable};
use crate::domain::urgency::UrgencyClassifier;
use crate::error::{AppError, AppResult};

pub const CONFIG_FILE_NAME: &str = "civium.toml";
pub const CONFIG_ENV: &str = "CIVIUM_CONFIG";
pub const STORE_URL_ENV: &str = "CIVIUM_STORE_URL";
pub const API_KEY_ENV: &str = "CIVIUM_API_KEY";
const DEFAULT_STORE_PATH: &str = ".civium/tickets.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workspace_root: PathBuf,
    /// Where the configuration was read from, or would be read from when absent.
    pub config_path: PathBuf,
    pub store: StoreConfig,
    pub rules: RuleTable,
    pub classifier: UrgencyClassifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    File { path: PathBuf },
    Rest { base_url: String, api_key: String },
    Memory,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    store: Option<StoreSection>,
    rules: Option<Vec<CategoryRule>>,
    urgency: Option<UrgencySection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreSection {
    backend: Option<String>,
    path: Option<PathBuf>,
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UrgencySection {
    danger_keywords: Option<Vec<String>>,
    sensitive_categories: Option<Vec<String>>,
}

impl AppConfig {
    /// Reads `civium.toml` from the workspace (or `CIVIUM_CONFIG`), then
    /// applies environment overrides. A missing file means builtin defaults.
    pub fn load(workspace_hint: &Path) -> AppResult<Self> {
        Self::load_with(workspace_hint, |key| env::var(key).ok())
    }

    fn load_with(
        workspace_hint: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let path = lookup(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| workspace_hint.join(CONFIG_FILE_NAME));

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading configuration file");
                contents
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(AppError::Io(err)),
        };

        let mut config = Self::from_toml(&contents, workspace_hint, lookup)?;
        config.config_path = path;
        Ok(config)
    }

    fn from_toml(
        contents: &str,
        workspace_hint: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|err| AppError::Configuration(format!("invalid {CONFIG_FILE_NAME}: {err}")))?;

        let rules = match file.rules {
            Some(rules) => RuleTable::from_rules(rules)?,
            None => RuleTable::builtin(),
        };

        let builtin = UrgencyClassifier::builtin();
        let urgency = file.urgency.unwrap_or_default();
        let classifier = UrgencyClassifier::new(
            urgency
                .danger_keywords
                .unwrap_or_else(|| builtin.danger_keywords().to_vec()),
            urgency
                .sensitive_categories
                .unwrap_or_else(|| builtin.sensitive_categories().to_vec()),
        );

        let mut section = file.store.unwrap_or_default();
        if let Some(url) = lookup(STORE_URL_ENV) {
            section.backend = Some("rest".to_string());
            section.base_url = Some(url);
        }
        if let Some(key) = lookup(API_KEY_ENV) {
            section.api_key = Some(key);
        }
        let store = StoreConfig::from_section(section, workspace_hint)?;

        Ok(Self {
            workspace_root: workspace_hint.to_path_buf(),
            config_path: workspace_hint.join(CONFIG_FILE_NAME),
            store,
            rules,
            classifier,
        })
    }

    pub fn engine(&self) -> DerivationEngine {
        DerivationEngine::new(self.rules.clone(), self.classifier.clone())
    }
}

impl StoreConfig {
    fn from_section(section: StoreSection, workspace_hint: &Path) -> AppResult<Self> {
        let backend = section
            .backend
            .as_deref()
            .map(|b| b.trim().to_lowercase())
            .unwrap_or_else(|| "file".to_string());

        match backend.as_str() {
            "file" => {
                let path = section
                    .path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
                let path = if path.is_absolute() {
                    path
                } else {
                    workspace_hint.join(path)
                };
                Ok(StoreConfig::File { path })
            }
            "rest" => {
                let base_url = section
                    .base_url
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Configuration("rest store requires base_url".to_string())
                    })?;
                let api_key = section
                    .api_key
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Configuration(format!(
                            "rest store requires api_key (or {API_KEY_ENV})"
                        ))
                    })?;
                Ok(StoreConfig::Rest { base_url, api_key })
            }
            "memory" => Ok(StoreConfig::Memory),
            other => Err(AppError::Configuration(format!(
                "unknown store backend '{other}'"
            ))),
        }
    }
}
