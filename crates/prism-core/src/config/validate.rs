//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    ///
    /// Called on load and again by `Pipeline::new`, so a hand-built `Config`
    /// gets the same construction-time guarantees as a loaded one.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.concurrency == 0 {
            return Err(ConfigError::Validation(
                "fetch.concurrency must be > 0".into(),
            ));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_ms must be > 0".into(),
            ));
        }
        if self.analysis.concurrency == 0 {
            return Err(ConfigError::Validation(
                "analysis.concurrency must be > 0".into(),
            ));
        }
        if self.analysis.top_n == 0 {
            return Err(ConfigError::Validation(
                "analysis.top_n must be > 0".into(),
            ));
        }
        if self.pipeline.buffer_size == 0 {
            return Err(ConfigError::Validation(
                "pipeline.buffer_size must be > 0".into(),
            ));
        }
        if self.limits.max_download_mb == 0 {
            return Err(ConfigError::Validation(
                "limits.max_download_mb must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_fetch_concurrency() {
        let mut config = Config::default();
        config.fetch.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fetch.concurrency"));
    }

    #[test]
    fn test_validate_rejects_zero_analysis_concurrency() {
        let mut config = Config::default();
        config.analysis.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("analysis.concurrency"));
    }

    #[test]
    fn test_validate_rejects_zero_top_n() {
        let mut config = Config::default();
        config.analysis.top_n = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_n"));
    }

    #[test]
    fn test_validate_rejects_zero_buffer_size() {
        let mut config = Config::default();
        config.pipeline.buffer_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.limits.max_download_mb = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.limits.decode_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
