use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};

/// Knobs for one preprocessing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Side length of the square neighbourhood. Must be odd.
    pub window: usize,
    /// Ignore cached metadata and decode both files again.
    ///
    /// The cache is keyed on the window size only, so a raw file replaced in
    /// place keeps serving the old CSV until this is set.
    #[serde(default)]
    pub refresh: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            window: 3,
            refresh: false,
        }
    }
}

impl PreprocessConfig {
    pub fn new(window: usize) -> Self {
        PreprocessConfig {
            window,
            ..Default::default()
        }
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window % 2 == 0 {
            return Err(PreprocessError::InvalidWindow {
                window: self.window,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_windows_only() {
        assert!(PreprocessConfig::default().validate().is_ok());
        assert!(PreprocessConfig::new(1).validate().is_ok());
        assert!(PreprocessConfig::new(7).validate().is_ok());
        for window in [0, 2, 4] {
            assert!(matches!(
                PreprocessConfig::new(window).validate(),
                Err(PreprocessError::InvalidWindow { window: w }) if w == window
            ));
        }
    }

    #[test]
    fn refresh_defaults_off() {
        let config: PreprocessConfig = serde_json::from_str(r#"{"window": 5}"#).unwrap();
        assert_eq!(config, PreprocessConfig::new(5));
        assert!(config.with_refresh(true).refresh);
    }
}
