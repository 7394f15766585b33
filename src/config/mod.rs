use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::currency::{CurrencyCode, LocaleConfig};
use crate::errors::BudgetError;
use crate::utils::{app_data_dir, ensure_dir};

const CONFIG_FILE: &str = "config.json";
const TMP_SUFFIX: &str = "tmp";

pub const BACKEND_URL_ENV: &str = "BUDGET_TRACKER_BACKEND_URL";
pub const ANON_KEY_ENV: &str = "BUDGET_TRACKER_ANON_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    pub default_currency: CurrencyCode,
    pub locale: LocaleConfig,
    pub upcoming_days: u32,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            default_currency: CurrencyCode::kes(),
            locale: LocaleConfig::default(),
            upcoming_days: crate::analytics::DEFAULT_UPCOMING_DAYS,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Replaces backend settings with values from `lookup` (normally the process
    /// environment). Blank values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_blank(BACKEND_URL_ENV) {
            self.backend_url = Some(url);
        }
        if let Some(key) = non_blank(ANON_KEY_ENV) {
            self.anon_key = Some(key);
        }
        self
    }

    /// Backend URL and key, or a configuration error naming what is missing.
    pub fn backend(&self) -> Result<(&str, &str), BudgetError> {
        let url = self.backend_url.as_deref().ok_or_else(|| {
            BudgetError::Config(format!("backend_url is not set (or export {BACKEND_URL_ENV})"))
        })?;
        let key = self.anon_key.as_deref().ok_or_else(|| {
            BudgetError::Config(format!("anon_key is not set (or export {ANON_KEY_ENV})"))
        })?;
        Ok((url, key))
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, BudgetError> {
        Self::from_base(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, BudgetError> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self, BudgetError> {
        ensure_dir(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    /// Reads the stored config (or defaults) and applies environment overrides.
    pub fn load(&self) -> Result<Config, BudgetError> {
        Ok(self.load_stored()?.with_overrides(|key| env::var(key).ok()))
    }

    /// Reads the stored config without consulting the environment.
    pub fn load_stored(&self) -> Result<Config, BudgetError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            let config = serde_json::from_str(&data)?;
            tracing::debug!(path = %self.path.display(), "loaded config");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), BudgetError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::info!(path = %self.path.display(), "saved config");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), BudgetError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_appends_suffix() {
        let tmp = tmp_path(Path::new("/data/config.json"));
        assert_eq!(tmp, PathBuf::from("/data/config.json.tmp"));
    }

    #[test]
    fn overrides_replace_backend_settings_but_skip_blanks() {
        let config = Config::default().with_overrides(|key| match key {
            BACKEND_URL_ENV => Some("https://example.test".into()),
            ANON_KEY_ENV => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.backend_url.as_deref(), Some("https://example.test"));
        assert!(config.anon_key.is_none());
        assert!(matches!(config.backend(), Err(BudgetError::Config(_))));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = serde_json::from_str(r#"{"upcoming_days": 14}"#).unwrap();
        assert_eq!(config.upcoming_days, 14);
        assert_eq!(config.default_currency, CurrencyCode::kes());
    }
}
