use crate::error::ConfigError;
use std::time::Duration;

pub const PRODUCTION_TOKEN_PREFIX: &str = "APP_USR-";

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub provider_base_url: String,
    pub sync: SyncSettings,
    pub timeouts: ProviderTimeouts,
    pub mask_payer_name: bool,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub default_days_back: i64,
    pub page_size: u32,
    pub page_delay: Duration,
    pub checkpoint_overlap: chrono::Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_days_back: 2,
            page_size: 50,
            page_delay: Duration::from_millis(200),
            checkpoint_overlap: chrono::Duration::minutes(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderTimeouts {
    pub search: Duration,
    pub detail: Duration,
    pub user: Duration,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(60),
            detail: Duration::from_secs(30),
            user: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SyncSettings::default();
        let timeouts = ProviderTimeouts::default();
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://payments.db".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            provider_base_url: std::env::var("MP_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.mercadopago.com".to_string()),
            sync: SyncSettings {
                default_days_back: env_parse("SYNC_DAYS_BACK").unwrap_or(defaults.default_days_back),
                page_size: env_parse("SYNC_PAGE_SIZE")
                    .filter(|n: &u32| *n > 0)
                    .unwrap_or(defaults.page_size),
                page_delay: env_parse("SYNC_PAGE_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.page_delay),
                checkpoint_overlap: env_parse("SYNC_CHECKPOINT_OVERLAP_SECS")
                    .map(chrono::Duration::seconds)
                    .unwrap_or(defaults.checkpoint_overlap),
            },
            timeouts: ProviderTimeouts {
                search: env_parse("MP_SEARCH_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(timeouts.search),
                detail: env_parse("MP_DETAIL_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(timeouts.detail),
                user: env_parse("MP_USER_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(timeouts.user),
            },
            mask_payer_name: env_parse::<bool>("VERIFY_MASK_PAYER_NAME").unwrap_or(false),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[derive(Clone)]
pub struct ProviderCredentials {
    pub access_token: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl ProviderCredentials {
    /// Reads `MP_ACCESS_TOKEN`, falling back to the legacy `Access_Token` name.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(
            std::env::var("MP_ACCESS_TOKEN").ok(),
            std::env::var("Access_Token").ok(),
        )
    }

    pub fn from_values(primary: Option<String>, legacy: Option<String>) -> Result<Self, ConfigError> {
        let token = primary
            .filter(|t| !t.trim().is_empty())
            .or_else(|| legacy.filter(|t| !t.trim().is_empty()))
            .map(|t| t.trim().to_string())
            .ok_or(ConfigError::MissingToken)?;

        if !token.starts_with(PRODUCTION_TOKEN_PREFIX) {
            return Err(ConfigError::NonProductionToken);
        }

        Ok(Self { access_token: token })
    }
}
