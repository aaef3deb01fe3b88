use secrecy::SecretString;
use std::env;
use std::path::PathBuf;

/// One Gemini credential: API key, the model it calls, and its daily budget.
#[derive(Clone, Debug)]
pub struct CredentialConfig {
    pub api_key: SecretString,
    pub model: String,
    pub daily_limit: u64,
}

/// Deployment configuration, sourced from `ADUAN_*` environment variables.
/// Unset or unparsable values silently fall back to the defaults below; keys
/// have no default, so an unset key leaves that credential unconfigured.
#[derive(Clone, Debug)]
pub struct Config {
    pub primary: Option<CredentialConfig>,
    pub secondary: Option<CredentialConfig>,
    pub data_dir: PathBuf,
    pub port: u16,
    pub emergency_retention_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary: None,
            secondary: None,
            data_dir: PathBuf::from("data"),
            port: 8630,
            emergency_retention_hours: 720,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            primary: credential_from_env(
                "ADUAN_LLM_KEY_PRIMARY",
                "ADUAN_LLM_MODEL_PRIMARY",
                "ADUAN_DAILY_LIMIT_PRIMARY",
                "gemini-2.0-flash",
            ),
            secondary: credential_from_env(
                "ADUAN_LLM_KEY_SECONDARY",
                "ADUAN_LLM_MODEL_SECONDARY",
                "ADUAN_DAILY_LIMIT_SECONDARY",
                "gemini-2.0-flash-lite",
            ),
            data_dir: env::var("ADUAN_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            port: env_parse("ADUAN_PORT", defaults.port),
            emergency_retention_hours: env_parse(
                "ADUAN_RETENTION_HOURS",
                defaults.emergency_retention_hours,
            ),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("aduan.db")
    }

    pub fn quota_path(&self) -> PathBuf {
        self.data_dir.join("quota.json")
    }

    pub fn salt_path(&self) -> PathBuf {
        self.data_dir.join("emergency.salt")
    }

    pub fn has_any_credential(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }
}

fn credential_from_env(
    key_var: &str,
    model_var: &str,
    limit_var: &str,
    default_model: &str,
) -> Option<CredentialConfig> {
    let key = env::var(key_var).ok().filter(|k| !k.trim().is_empty())?;
    Some(CredentialConfig {
        api_key: SecretString::from(key),
        model: env::var(model_var).unwrap_or_else(|_| default_model.to_string()),
        daily_limit: env_parse(limit_var, 1500),
    })
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
