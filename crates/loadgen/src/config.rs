//! Configuration types for a load run.
//!
//! Every field has a default, so a TOML file only needs to name what it
//! overrides:
//!
//! ```toml
//! base_url = "http://localhost:8080"
//! users = 500
//!
//! [session]
//! max_transfers = 4
//!
//! [weights]
//! check_balance = 0
//! ```

use rand::distributions::WeightedError;
use serde::{Deserialize, Serialize};
use shopload_types::{Catalog, CatalogError};
use std::path::Path;
use std::time::Duration;

/// Configuration for a load run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Base URL of the API under test.
    pub base_url: String,

    /// Number of virtual users to start.
    pub users: usize,

    /// Users started per second during ramp-up.
    pub spawn_rate: f64,

    /// Random seed. Each user derives its own stream from it.
    pub seed: u64,

    /// Prefix for generated usernames (`<prefix><n>`).
    pub identity_prefix: String,

    /// Password every virtual user authenticates with.
    pub password: String,

    /// Pause between a user's actions.
    pub think_time: ThinkTime,

    /// Per-session limits and amounts.
    pub session: SessionConfig,

    /// Relative task weights.
    pub weights: TaskWeights,

    /// Purchasable items.
    pub catalog: Catalog,

    /// HTTP client settings.
    pub http: HttpConfig,
}

impl LoadConfig {
    /// Create a configuration targeting `base_url` with defaults elsewhere.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Set the number of virtual users.
    pub fn with_users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    /// Set the ramp-up rate in users per second.
    pub fn with_spawn_rate(mut self, rate: f64) -> Self {
        self.spawn_rate = rate;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the think-time bounds.
    pub fn with_think_time(mut self, min: Duration, max: Duration) -> Self {
        self.think_time = ThinkTime::new(min, max);
        self
    }

    /// Set the session configuration.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Set the task weights.
    pub fn with_weights(mut self, weights: TaskWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the catalog.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the identity prefix.
    pub fn with_identity_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.identity_prefix = prefix.into();
        self
    }

    /// Check the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spawn_rate.is_finite() && self.spawn_rate > 0.0)
            || Duration::try_from_secs_f64(1.0 / self.spawn_rate).is_err()
        {
            return Err(ConfigError::InvalidSpawnRate(self.spawn_rate));
        }
        if self.think_time.min_us > self.think_time.max_us {
            return Err(ConfigError::InvalidThinkTime {
                min_us: self.think_time.min_us,
                max_us: self.think_time.max_us,
            });
        }
        if self.session.transfer_amount == 0 {
            return Err(ConfigError::ZeroTransferAmount);
        }
        if self.weights.total() == 0 {
            return Err(ConfigError::NoTasks(WeightedError::AllWeightsZero));
        }
        self.catalog.validate()?;
        Ok(())
    }

    /// Time between consecutive user spawns.
    ///
    /// Saturates at `Duration::MAX` for rates `validate` rejects.
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).unwrap_or(Duration::MAX)
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            users: 100,
            spawn_rate: 10.0,
            seed: 12345,
            identity_prefix: "user".to_string(),
            password: "password".to_string(),
            think_time: ThinkTime::default(),
            session: SessionConfig::default(),
            weights: TaskWeights::default(),
            catalog: Catalog::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Bounds of the random pause between a user's actions, in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThinkTime {
    pub min_us: u64,
    pub max_us: u64,
}

impl ThinkTime {
    /// Bounds from durations. Pauses beyond `u64::MAX` microseconds saturate.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min_us: saturating_micros(min),
            max_us: saturating_micros(max),
        }
    }

    pub fn min(&self) -> Duration {
        Duration::from_micros(self.min_us)
    }

    pub fn max(&self) -> Duration {
        Duration::from_micros(self.max_us)
    }
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self {
            min_us: 1_000,
            max_us: 5_000,
        }
    }
}

fn saturating_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Per-session limits and amounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Coins a user is assumed to hold right after authenticating.
    pub initial_balance: u64,

    /// Coins sent per transfer.
    pub transfer_amount: u64,

    /// Successful transfers allowed per session.
    pub max_transfers: u32,

    /// Successful purchases allowed per session.
    pub max_purchases: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000,
            transfer_amount: 100,
            max_transfers: 2,
            max_purchases: 1,
        }
    }
}

/// Relative weights of the scheduler's tasks.
///
/// Weights are over task identities, so `transfer_then_purchase` adds to the
/// standalone transfer and purchase weights rather than splitting them.
/// A weight of zero disables the task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskWeights {
    pub purchase: u32,
    pub transfer: u32,
    pub transfer_then_purchase: u32,
    pub check_balance: u32,
}

impl TaskWeights {
    /// Sum of all weights.
    pub fn total(&self) -> u64 {
        [
            self.purchase,
            self.transfer,
            self.transfer_then_purchase,
            self.check_balance,
        ]
        .iter()
        .map(|&w| w as u64)
        .sum()
    }

    /// Only check balances.
    pub fn check_balance_only() -> Self {
        Self {
            purchase: 0,
            transfer: 0,
            transfer_then_purchase: 0,
            check_balance: 1,
        }
    }
}

impl Default for TaskWeights {
    fn default() -> Self {
        Self {
            purchase: 8,
            transfer: 5,
            transfer_then_purchase: 2,
            check_balance: 1,
        }
    }
}

/// HTTP client settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Whole-request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: 10_000,
            pool_max_idle_per_host: 64,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Spawn rate must be a positive number, got {0}")]
    InvalidSpawnRate(f64),

    #[error("Think time minimum {min_us}us exceeds maximum {max_us}us")]
    InvalidThinkTime { min_us: u64, max_us: u64 },

    #[error("Transfer amount must be positive")]
    ZeroTransferAmount,

    #[error("No schedulable tasks: {0}")]
    NoTasks(#[from] WeightedError),

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}
