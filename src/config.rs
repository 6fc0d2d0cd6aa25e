use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub rating: RatingConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub tiers: TierConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Volatile store for dry runs; nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/matchbook".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    /// Seconds the opposing side has to confirm before the proposal expires
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Reload and reattach unresolved proposals when the service starts
    #[serde(default = "default_true")]
    pub recover_on_start: bool,
}

fn default_timeout_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            recover_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RatingConfig {
    /// Maximum rating swing per match
    #[serde(default = "default_k_factor")]
    pub k_factor: f64,
    /// Rating gap at which the stronger side is 10x as likely to win
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Rating assigned to new participants and teams
    #[serde(default = "default_initial_rating")]
    pub initial_rating: f64,
}

fn default_k_factor() -> f64 {
    32.0
}

fn default_scale() -> f64 {
    400.0
}

fn default_initial_rating() -> f64 {
    1500.0
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: default_k_factor(),
            scale: default_scale(),
            initial_rating: default_initial_rating(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EconomyConfig {
    /// Coins minted for each participant of a confirmed duel
    #[serde(default = "default_match_reward")]
    pub match_reward: i64,
    /// Payout rate (percent) seeded into a fresh house account
    #[serde(default = "default_payout_rate")]
    pub default_payout_rate: Decimal,
}

fn default_match_reward() -> i64 {
    3
}

fn default_payout_rate() -> Decimal {
    dec!(5.00)
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            match_reward: default_match_reward(),
            default_payout_rate: default_payout_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    /// Cumulative percentages of the population below the podium, one per badge
    #[serde(default = "default_tier_cutoffs")]
    pub cumulative_pct: Vec<u32>,
}

fn default_tier_cutoffs() -> Vec<u32> {
    vec![10, 20, 50, 80, 100]
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            cumulative_pct: default_tier_cutoffs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FanoutConfig {
    /// Channels subscribed to confirmed results
    #[serde(default)]
    pub channels: Vec<String>,
    /// Pause between consecutive channel sends
    #[serde(default = "default_fanout_delay_ms")]
    pub delay_ms: u64,
}

fn default_fanout_delay_ms() -> u64 {
    500
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            delay_ms: default_fanout_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AffordanceStyle {
    #[default]
    Buttons,
    Reactions,
}

impl AffordanceStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffordanceStyle::Buttons => "buttons",
            AffordanceStyle::Reactions => "reactions",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessengerConfig {
    /// Chat bridge base URL; log-only messaging when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub affordance: AffordanceStyle,
    /// Channel where confirm/deny prompts are posted
    #[serde(default = "default_prompt_channel")]
    pub prompt_channel: String,
}

fn default_prompt_channel() -> String {
    "match-results".to_string()
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            affordance: AffordanceStyle::default(),
            prompt_channel: default_prompt_channel(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the daily rolling log file
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("MATCHBOOK_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // MATCHBOOK_DATABASE__URL, MATCHBOOK_CONFIRMATION__TIMEOUT_SECS, ...
            .add_source(
                Environment::with_prefix("MATCHBOOK")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// In-memory configuration for dry runs and tests
    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            database: DatabaseConfig::default(),
            confirmation: ConfirmationConfig::default(),
            rating: RatingConfig::default(),
            economy: EconomyConfig::default(),
            tiers: TierConfig::default(),
            fanout: FanoutConfig::default(),
            messenger: MessengerConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.confirmation.timeout_secs == 0 {
            errors.push("confirmation.timeout_secs must be positive".to_string());
        }

        if self.rating.k_factor <= 0.0 {
            errors.push("rating.k_factor must be positive".to_string());
        }

        if self.rating.scale <= 0.0 {
            errors.push("rating.scale must be positive".to_string());
        }

        if self.economy.match_reward < 0 {
            errors.push("economy.match_reward must not be negative".to_string());
        }

        if self.economy.default_payout_rate < Decimal::ZERO
            || self.economy.default_payout_rate > dec!(100)
        {
            errors.push("economy.default_payout_rate must be between 0 and 100".to_string());
        }

        let cutoffs = &self.tiers.cumulative_pct;
        if cutoffs.len() != 5
            || cutoffs.windows(2).any(|w| w[0] >= w[1])
            || cutoffs.last() != Some(&100)
        {
            errors.push(
                "tiers.cumulative_pct needs 5 strictly increasing values ending at 100"
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
