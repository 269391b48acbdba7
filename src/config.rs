use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    // Audio
    pub default_volume: u8,
    pub volume_step: u8,

    // Selección de canciones
    pub choice_timeout: Duration,

    // Vistas
    pub queue_page_size: usize,

    // Logging
    pub log_filter: String,
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            default_volume: match var("DEFAULT_VOLUME") {
                Some(val) => val.trim().parse().context("DEFAULT_VOLUME inválido")?,
                None => defaults.default_volume,
            },
            volume_step: match var("VOLUME_STEP") {
                Some(val) => val.trim().parse().context("VOLUME_STEP inválido")?,
                None => defaults.volume_step,
            },
            choice_timeout: match var("CHOICE_TIMEOUT") {
                Some(val) => humantime::parse_duration(val.trim()).context("CHOICE_TIMEOUT inválido")?,
                None => defaults.choice_timeout,
            },
            queue_page_size: match var("QUEUE_PAGE_SIZE") {
                Some(val) => val.trim().parse().context("QUEUE_PAGE_SIZE inválido")?,
                None => defaults.queue_page_size,
            },
            log_filter: var("LOG_FILTER").unwrap_or(defaults.log_filter),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Default volume must be between 0 and 100
    /// - Volume step must be between 1 and 100
    /// - Choice timeout and page size must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.default_volume > 100 {
            anyhow::bail!("Default volume must be between 0 and 100, got: {}", self.default_volume);
        }

        if self.volume_step == 0 || self.volume_step > 100 {
            anyhow::bail!("Volume step must be between 1 and 100, got: {}", self.volume_step);
        }

        if self.choice_timeout.is_zero() {
            anyhow::bail!("Choice timeout must be greater than 0");
        }

        if self.queue_page_size == 0 {
            anyhow::bail!("Queue page size must be greater than 0");
        }

        if self.log_filter.trim().is_empty() {
            anyhow::bail!("Log filter must not be empty");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Audio: {}% vol, step {}%\n  \
            Selection: {} timeout\n  \
            Queue: {} tracks per page",
            self.default_volume,
            self.volume_step,
            humantime::format_duration(self.choice_timeout),
            self.queue_page_size,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_volume: 100,
            volume_step: 10,
            choice_timeout: Duration::from_secs(60),
            queue_page_size: 10,
            log_filter: "open_music_sessions=debug,songbird=info".to_string(),
        }
    }
}
