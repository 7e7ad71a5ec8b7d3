use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

const CONFIG_FILE_ENV: &str = "ISSUEGATE_CONFIG_FILE";
const SECRET_KEYS: [&str; 1] = ["password"];

/// One entry of a tracker's settings form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub optional: bool,
}

impl FieldSpec {
    pub const fn required(key: &'static str, label: &'static str, placeholder: &'static str) -> Self {
        Self {
            key,
            label,
            placeholder,
            optional: false,
        }
    }

    pub const fn optional(key: &'static str, label: &'static str, placeholder: &'static str) -> Self {
        Self {
            key,
            label,
            placeholder,
            optional: true,
        }
    }
}

/// A validation complaint for the host to render next to the form.
///
/// `field` is `None` when the message applies to the form as a whole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationError {
    pub field: Option<&'static str>,
    pub message: String,
}

/// Read-only key/value settings supplied by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

#[derive(Default, Deserialize)]
struct RawConfig {
    #[serde(flatten)]
    entries: BTreeMap<String, Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value as stored, including blank strings.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Trimmed value, or `None` when absent or blank.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(non_empty_str)
    }

    pub fn is_blank(&self, key: &str) -> bool {
        self.value(key).is_none()
    }

    pub fn load_default(section: &str) -> Result<Self> {
        Self::load_from_path(&default_config_path(), section)
    }

    /// Loads scalar settings from a YAML file.
    ///
    /// Keys under the mapping named `section` take precedence over top-level keys.
    pub fn load_from_path(path: &Path, section: &str) -> Result<Self> {
        let payload = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let raw: RawConfig =
            serde_yaml::from_str(&payload).with_context(|| "invalid YAML config format")?;
        debug!(path = %path.display(), section, "loaded configuration file");
        Ok(Self::from_raw(raw, section))
    }

    fn from_raw(mut raw: RawConfig, section: &str) -> Self {
        let scoped = match raw.entries.remove(section) {
            Some(Value::Mapping(mapping)) => mapping
                .into_iter()
                .filter_map(|(key, value)| Some((scalar_string(key)?, value)))
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };

        let mut config = Self::new();
        for (key, value) in raw.entries.into_iter().chain(scoped) {
            if let Some(value) = scalar_string(value) {
                config.insert(key, value);
            }
        }

        for key in SECRET_KEYS {
            if let Some(value) = config.values.remove(key) {
                if let Some(resolved) = resolve_secret(value) {
                    config.insert(key, resolved);
                }
            }
        }

        config
    }
}

impl<K, V> FromIterator<(K, V)> for Configuration
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (key, value) in iter {
            config.insert(key, value);
        }
        config
    }
}

/// One error per non-optional field whose value is blank, in field order.
pub fn validate_required(fields: &[FieldSpec], config: &Configuration) -> Vec<ConfigurationError> {
    fields
        .iter()
        .filter(|field| !field.optional && config.is_blank(field.key))
        .map(|field| ConfigurationError {
            field: Some(field.key),
            message: format!("{} must not be blank", field.label),
        })
        .collect()
}

pub fn has_unique_keys(fields: &[FieldSpec]) -> bool {
    fields
        .iter()
        .enumerate()
        .all(|(index, field)| fields[..index].iter().all(|seen| seen.key != field.key))
}

pub fn default_config_path() -> PathBuf {
    if let Some(override_path) = env::var_os(CONFIG_FILE_ENV) {
        return PathBuf::from(override_path);
    }

    let mut base = env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.push(".config");
    base.push("issuegate");
    base.push("config.yaml");
    base
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn non_empty_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed)
}

fn resolve_secret(value: String) -> Option<String> {
    resolve_secret_with(value, fetch_secret_from_manager)
}

fn resolve_secret_with<F>(value: String, fetch: F) -> Option<String>
where
    F: Fn(&str, &str) -> Option<String>,
{
    let secret = non_empty(value)?;
    let Some((provider, key)) = parse_secret_reference(secret.as_str()) else {
        return Some(secret);
    };
    fetch(provider, key)
}

fn parse_secret_reference(value: &str) -> Option<(&str, &str)> {
    let (provider, key) = value.split_once("::")?;
    if key.trim().is_empty() {
        return None;
    }
    if provider == "pass" || provider == "passage" {
        Some((provider, key.trim()))
    } else {
        None
    }
}

fn fetch_secret_from_manager(provider: &str, key: &str) -> Option<String> {
    let output = Command::new(provider).arg("show").arg(key).output().ok()?;
    if !output.status.success() {
        debug!(provider, "secret manager lookup failed");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    non_empty(stdout.trim().to_string())
}
