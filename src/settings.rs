use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::yandex_gpt::DEFAULT_LLM_ENDPOINT;
use crate::ai::yandex_vision::{DEFAULT_OCR_ENDPOINT, DEFAULT_OCR_LANGUAGES};
use crate::ai::{looks_like_iam_token, Credentials, GenerationConfig};
use crate::dialog::{PromptError, PromptTemplates};

/// Environment variable naming the optional TOML settings file.
pub const CONFIG_PATH_VAR: &str = "CHATCOACH_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "chatcoach.toml";
/// Optional `KEY=value` file in the working directory.
pub const DOTENV_FILE: &str = ".env";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to load {path}: {source}")]
    Dotenv {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("temperature must be within 0.0..=1.0, got {0}")]
    Temperature(f32),
    #[error("max tokens must be greater than zero")]
    MaxTokens,
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub bot_token: String,
    pub auth_token: String,
    pub folder_id: String,
    /// `None` means "decide from the token shape".
    pub use_bearer: Option<bool>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub ocr_endpoint: String,
    pub ocr_languages: Vec<String>,
    pub llm_endpoint: String,
    pub temp_dir: PathBuf,
    pub advice_prompt: String,
    pub analyze_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        let generation = GenerationConfig::default();
        let prompts = PromptTemplates::default();
        Self {
            bot_token: String::new(),
            auth_token: String::new(),
            folder_id: String::new(),
            use_bearer: None,
            model: generation.model,
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.into(),
            ocr_languages: DEFAULT_OCR_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            llm_endpoint: DEFAULT_LLM_ENDPOINT.into(),
            temp_dir: std::env::temp_dir().join("chatcoach"),
            advice_prompt: prompts.advice,
            analyze_prompt: prompts.analyze,
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &redacted(&self.bot_token))
            .field("auth_token", &redacted(&self.auth_token))
            .field("folder_id", &self.folder_id)
            .field("use_bearer", &self.use_bearer)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("ocr_languages", &self.ocr_languages)
            .field("llm_endpoint", &self.llm_endpoint)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Settings {
    /// Load from the settings file, `.env` and the process environment.
    ///
    /// A file named by `CHATCOACH_CONFIG` must exist; the default
    /// `chatcoach.toml` is optional.
    pub fn load() -> Result<Self, SettingsError> {
        let (path, required) = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => (PathBuf::from(path), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        Self::load_from(&path, required, Path::new(DOTENV_FILE), |name| {
            std::env::var(name).ok()
        })
    }

    /// Layering: defaults < settings file < `.env` < process environment.
    pub fn load_from<F>(
        config: &Path,
        required: bool,
        dotenv: &Path,
        env: F,
    ) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = if required || config.exists() {
            let settings = Self::from_file(config)?;
            log::info!("Settings loaded from {}", config.display());
            settings
        } else {
            log::info!("No settings file at {}, using defaults", config.display());
            Self::default()
        };

        let dotenv_vars = read_dotenv(dotenv)?;
        settings.apply_env(|name| env(name).or_else(|| dotenv_vars.get(name).cloned()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BOT_TOKEN") {
            self.bot_token = v;
        }
        if let Some(v) = get("YANDEX_AUTH_TOKEN") {
            self.auth_token = v;
        }
        if let Some(v) = get("YANDEX_FOLDER_ID") {
            self.folder_id = v;
        }
        if let Some(v) = get("YANDEX_USE_IAM") {
            self.use_bearer = Some(parse_bool("YANDEX_USE_IAM", &v)?);
        }
        if let Some(v) = get("YANDEX_GPT_MODEL") {
            self.model = v;
        }
        if let Some(v) = get("GPT_TEMPERATURE") {
            self.temperature = parse_value("GPT_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("GPT_MAX_TOKENS") {
            self.max_tokens = parse_value("GPT_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("YANDEX_OCR_ENDPOINT") {
            self.ocr_endpoint = v;
        }
        if let Some(v) = get("YANDEX_OCR_LANGUAGES") {
            self.ocr_languages = v
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("YANDEX_LLM_ENDPOINT") {
            self.llm_endpoint = v;
        }
        if let Some(v) = get("CHATCOACH_TEMP_DIR") {
            self.temp_dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.bot_token.trim().is_empty() {
            return Err(SettingsError::Missing("BOT_TOKEN"));
        }
        if self.auth_token.trim().is_empty() {
            return Err(SettingsError::Missing("YANDEX_AUTH_TOKEN"));
        }
        if self.folder_id.trim().is_empty() {
            return Err(SettingsError::Missing("YANDEX_FOLDER_ID"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(SettingsError::Temperature(self.temperature));
        }
        if self.max_tokens == 0 {
            return Err(SettingsError::MaxTokens);
        }
        if self.ocr_languages.is_empty() {
            return Err(SettingsError::Missing("YANDEX_OCR_LANGUAGES"));
        }
        self.prompts().validate()?;
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        let use_bearer = self
            .use_bearer
            .unwrap_or_else(|| looks_like_iam_token(&self.auth_token));
        Credentials::new(self.auth_token.clone(), self.folder_id.clone()).with_bearer(use_bearer)
    }

    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn prompts(&self) -> PromptTemplates {
        PromptTemplates {
            advice: self.advice_prompt.clone(),
            analyze: self.analyze_prompt.clone(),
        }
    }
}

/// `KEY=value` pairs from a dotenv file; a missing file yields nothing.
/// The file never overrides variables already set in the process.
fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, SettingsError> {
    let to_error = |source| SettingsError::Dotenv {
        path: path.to_path_buf(),
        source,
    };
    match dotenvy::from_path_iter(path) {
        Ok(iter) => {
            let vars = iter
                .collect::<Result<HashMap<_, _>, _>>()
                .map_err(to_error)?;
            log::info!("Loaded {} variable(s) from {}", vars.len(), path.display());
            Ok(vars)
        }
        Err(e) if e.not_found() => {
            log::debug!("No {} file, skipping", path.display());
            Ok(HashMap::new())
        }
        Err(e) => Err(to_error(e)),
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidValue {
            name,
            value: value.to_string(),
        })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}
