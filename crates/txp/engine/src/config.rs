//! Engine configuration.
//!
//! Configuration is loaded from the embedded base configuration file and overridden by
//! environment variables prefixed with `MULTISIGTXP_`.

use core::{num::NonZeroU32, time::Duration};

use chrono::TimeDelta;
use config::{ConfigError, Environment, File, FileFormat};
use multisig_txp_domain::classify;
use serde::Deserialize;

/// Loads the engine configuration from the base config and environment variables.
///
/// Environment variables use double underscores `__` to denote nested keys.
/// For example, `MULTISIGTXP_BALANCE_POLL__MAX_ATTEMPTS` corresponds to
/// `balance_poll.max_attempts`.
///
/// # Errors
///
/// If the configuration could not be loaded or parsed, or sets a zero period
pub fn get_configuration() -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = config::Config::builder()
        .add_source(File::from_str(include_str!("base_config.ron"), FileFormat::Ron))
        .add_source(
            Environment::with_prefix(EngineConfig::CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    config.validate()?;

    Ok(config)
}

/// Shortest period a countdown or poll interval ticks at.
pub(crate) const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Root configuration of the proposal engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Time after creation from which any copayer may delete a proposal
    #[serde(with = "humantime_serde")]
    pub removal_grace: Duration,

    /// Resolution of the payment-request countdown
    #[serde(with = "humantime_serde")]
    pub countdown_tick: Duration,

    /// Post-broadcast balance polling
    pub balance_poll: BalancePollConfig,
}

/// Settings of the balance watch started after a broadcast.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BalancePollConfig {
    /// Delay between two balance reads
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Number of reads before giving up
    pub max_attempts: NonZeroU32,
}

impl EngineConfig {
    const CONFIG_ENV_PREFIX: &str = "MULTISIGTXP";

    /// Checks that the countdown tick and the balance poll interval are non-zero.
    ///
    /// # Errors
    ///
    /// If either period is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown_tick.is_zero() {
            return Err(ConfigError::Message("countdown_tick must be non-zero".to_owned()));
        }

        if self.balance_poll.interval.is_zero() {
            return Err(ConfigError::Message("balance_poll.interval must be non-zero".to_owned()));
        }

        Ok(())
    }

    /// Returns the removal grace as a signed duration.
    pub fn removal_grace_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.removal_grace)
            .unwrap_or_else(|_| classify::default_removal_grace())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            removal_grace: Duration::from_secs(10 * 60),
            countdown_tick: Duration::from_secs(1),
            balance_poll: BalancePollConfig::default(),
        }
    }
}

impl Default for BalancePollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: NonZeroU32::MIN.saturating_add(11),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_config_matches_defaults() {
        let config = get_configuration().unwrap();
        let defaults = EngineConfig::default();

        assert_eq!(config.removal_grace, defaults.removal_grace);
        assert_eq!(config.countdown_tick, defaults.countdown_tick);
        assert_eq!(config.balance_poll.interval, defaults.balance_poll.interval);
        assert_eq!(config.balance_poll.max_attempts.get(), 12);
        assert_eq!(config.removal_grace_delta(), TimeDelta::minutes(10));
    }

    #[test]
    fn zero_periods_are_rejected() {
        let zero_tick = EngineConfig { countdown_tick: Duration::ZERO, ..EngineConfig::default() };
        let err = zero_tick.validate().unwrap_err();
        assert!(err.to_string().contains("countdown_tick"));

        let zero_poll = EngineConfig {
            balance_poll: BalancePollConfig {
                interval: Duration::ZERO,
                ..BalancePollConfig::default()
            },
            ..EngineConfig::default()
        };
        let err = zero_poll.validate().unwrap_err();
        assert!(err.to_string().contains("balance_poll.interval"));

        assert!(EngineConfig::default().validate().is_ok());
    }
}
