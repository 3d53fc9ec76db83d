//! Game rule settings loaded from config.toml
//!
//! Every value has a default matching the live bot, so a missing file or a
//! partial file is fine. Only the commands channel comes from the environment.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Steal lifecycle rules
    pub steal: StealSettings,
    /// Doubling chain rules
    pub doubling: DoublingSettings,
    /// Knife sharpening rules
    pub sharpen: SharpenSettings,
    /// Expiry sweep scheduling
    pub sweep: SweepSettings,
    /// Channel commands are restricted to, from `BOTS_AND_COMMANDS_CHANNEL_ID`
    #[serde(skip)]
    pub commands_channel_id: Option<u64>,
}

/// `[steal]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StealSettings {
    /// Amount moved from target to attacker on an undefended steal
    pub payout: i64,
    /// Seconds the target has to defend
    pub expiry_secs: u64,
    /// Reaction the target must add to defend
    pub defend_symbol: String,
    /// Seconds between two steals by the same attacker
    pub cooldown_secs: u64,
}

impl Default for StealSettings {
    fn default() -> Self {
        Self {
            payout: 5,
            expiry_secs: 2400,
            defend_symbol: "🛡️".to_string(),
            cooldown_secs: 86_400,
        }
    }
}

/// `[doubling]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DoublingSettings {
    /// Pause before each round, in seconds
    pub delay_secs: u64,
    /// Rolls at or below this value double the amount
    pub success_chance: f64,
}

impl Default for DoublingSettings {
    fn default() -> Self {
        Self {
            delay_secs: 3,
            success_chance: 0.5,
        }
    }
}

/// `[sharpen]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SharpenSettings {
    /// Price of one sharpening
    pub cost: i64,
    /// Highest sharpness stack reachable
    pub max_stack: i32,
    /// Seconds between two sharpenings
    pub cooldown_secs: u64,
    /// Skills that must have been used before sharpening unlocks
    pub skills_required: i32,
}

impl Default for SharpenSettings {
    fn default() -> Self {
        Self {
            cost: 500,
            max_stack: 5,
            cooldown_secs: 2_592_000,
            skills_required: 5,
        }
    }
}

/// `[sweep]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// Seconds between two expiry sweeps
    pub interval_secs: u64,
    /// Upper bound on a single notification delivery, in seconds
    pub notify_timeout_secs: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            notify_timeout_secs: 5,
        }
    }
}

impl StealSettings {
    /// Expiry window as a [`Duration`]
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }

    /// Steal cooldown as a [`Duration`]
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl SharpenSettings {
    /// Sharpen cooldown as a [`Duration`]
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Settings {
    /// Rejects values the engine can't run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::Config {
                message: message.to_string(),
            })
        };
        if self.steal.payout <= 0 {
            return invalid("steal.payout must be positive");
        }
        if !(0.0..=1.0).contains(&self.doubling.success_chance) {
            return invalid("doubling.success_chance must be between 0 and 1");
        }
        if self.sweep.interval_secs == 0 {
            return invalid("sweep.interval_secs must be at least 1");
        }
        if self.sharpen.max_stack < 0 || self.sharpen.cost < 0 {
            return invalid("sharpen.max_stack and sharpen.cost can't be negative");
        }
        Ok(())
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns `Error::Config` if the TOML syntax is invalid a value has the wrong type or is out of range.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from a TOML file, falling back to defaults if the file doesn't exist.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let mut settings = match std::fs::read_to_string(path) {
        Ok(contents) => parse_settings(&contents)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            Settings::default()
        }
        Err(e) => {
            return Err(Error::Config {
                message: format!("Failed to read config file: {e}"),
            });
        }
    };

    settings.commands_channel_id = commands_channel_from_env()?;
    Ok(settings)
}

/// Loads settings from `PRAWLER_CONFIG`, or ./config.toml when unset
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("PRAWLER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_settings(path)
}

fn commands_channel_from_env() -> Result<Option<u64>> {
    match std::env::var("BOTS_AND_COMMANDS_CHANNEL_ID") {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e| Error::Config {
            message: format!("BOTS_AND_COMMANDS_CHANNEL_ID is not a channel id: {e}"),
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_partial_settings() {
        let toml_str = r#"
            [steal]
            payout = 10
            expiry_secs = 60

            [doubling]
            success_chance = 0.25
        "#;

        let settings = parse_settings(toml_str).unwrap();
        assert_eq!(settings.steal.payout, 10);
        assert_eq!(settings.steal.expiry(), Duration::from_secs(60));
        assert_eq!(settings.steal.defend_symbol, "🛡️");
        assert_eq!(settings.doubling.success_chance, 0.25);
        assert_eq!(settings.doubling.delay_secs, 3);
        assert_eq!(settings.sharpen.max_stack, 5);
        assert_eq!(settings.sweep.interval_secs, 60);
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.steal.payout, 5);
        assert_eq!(settings.steal.expiry_secs, 2400);
        assert_eq!(settings.sharpen.cost, 500);
        assert_eq!(settings.sharpen.cooldown(), Duration::from_secs(2_592_000));
        assert!(settings.commands_channel_id.is_none());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = parse_settings("[steal]\npayout = \"five\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for toml_str in [
            "[doubling]\nsuccess_chance = 1.5",
            "[sweep]\ninterval_secs = 0",
            "[steal]\npayout = 0",
        ] {
            assert!(
                matches!(parse_settings(toml_str), Err(Error::Config { .. })),
                "accepted {toml_str}"
            );
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = load_settings("definitely/not/here/config.toml").unwrap();
        assert_eq!(settings.steal.payout, 5);
    }
}
