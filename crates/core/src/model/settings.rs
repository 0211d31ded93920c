use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("grid size must be between {min} and {max}, got {got}")]
    InvalidGridSize { got: usize, min: usize, max: usize },

    #[error("default time limit must be > 0")]
    InvalidTimeLimit,

    #[error("tick interval must be between 10 and 60000 ms")]
    InvalidTickInterval,
}

/// Tunables for the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    grid_size: usize,
    default_time_limit_secs: u32,
    tick_interval_ms: u64,
}

impl EngineSettings {
    pub const MIN_GRID_SIZE: usize = 4;
    pub const MAX_GRID_SIZE: usize = 26;

    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a value falls outside its allowed range.
    pub fn new(
        grid_size: usize,
        default_time_limit_secs: u32,
        tick_interval_ms: u64,
    ) -> Result<Self, SettingsError> {
        let settings = Self {
            grid_size,
            default_time_limit_secs,
            tick_interval_ms,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check ranges. Deserialized settings must pass this before use.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a value falls outside its allowed range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(Self::MIN_GRID_SIZE..=Self::MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(SettingsError::InvalidGridSize {
                got: self.grid_size,
                min: Self::MIN_GRID_SIZE,
                max: Self::MAX_GRID_SIZE,
            });
        }
        if self.default_time_limit_secs == 0 {
            return Err(SettingsError::InvalidTimeLimit);
        }
        if !(10..=60_000).contains(&self.tick_interval_ms) {
            return Err(SettingsError::InvalidTickInterval);
        }
        Ok(())
    }

    /// Side length of word-search grids.
    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Countdown used when a question carries no time limit of its own.
    #[must_use]
    pub fn default_time_limit_secs(&self) -> u32 {
        self.default_time_limit_secs
    }

    /// Wall-clock length of one countdown second.
    #[must_use]
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            grid_size: 10,
            default_time_limit_secs: 30,
            tick_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = EngineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.grid_size(), 10);
        assert_eq!(settings.default_time_limit_secs(), 30);
    }

    #[test]
    fn tiny_grid_rejected() {
        let err = EngineSettings::new(2, 30, 1000).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidGridSize { got: 2, .. }));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: EngineSettings = serde_json::from_str(r#"{"grid_size": 12}"#).unwrap();
        assert_eq!(settings.grid_size(), 12);
        assert_eq!(settings.default_time_limit_secs(), 30);
    }
}
