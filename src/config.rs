use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatchingConfig {
    /// Upper bound of the CPI scale; role requirements above it are rejected.
    pub max_cpi: f64,
    /// Interval between refresh cycles of the `auto` command.
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "placement.db".to_string(),
                busy_timeout_ms: 5000,
            },
            matching: MatchingConfig {
                max_cpi: 10.0,
                refresh_interval_secs: 3600,
            },
            logging: LoggingConfig {
                filter: "placement_matcher=info,placement=info".to_string(),
            },
        }
    }
}

impl Config {
    /// Layers defaults, the optional config file and `PLACEMENT__*` env vars.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let config = config::Config::builder()
            .set_default("database.path", defaults.database.path)?
            .set_default("database.busy_timeout_ms", defaults.database.busy_timeout_ms)?
            .set_default("matching.max_cpi", defaults.matching.max_cpi)?
            .set_default(
                "matching.refresh_interval_secs",
                defaults.matching.refresh_interval_secs,
            )?
            .set_default("logging.filter", defaults.logging.filter)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PLACEMENT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let loaded: Config = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.matching.max_cpi.is_finite() || self.matching.max_cpi <= 0.0 {
            anyhow::bail!("matching.max_cpi must be a positive number");
        }
        if self.matching.refresh_interval_secs == 0 {
            anyhow::bail!("matching.refresh_interval_secs must be greater than zero");
        }
        if self.database.path.trim().is_empty() {
            anyhow::bail!("database.path must not be empty");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
