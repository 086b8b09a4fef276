// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration loaded from environment variables.

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Run the beam pocket, junction and validation stages concurrently.
    pub parallel_fan_out: bool,
    /// Maximum document size in MB.
    pub max_document_mb: usize,
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            parallel_fan_out: std::env::var("EHX_PARALLEL_FAN_OUT")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
            max_document_mb: std::env::var("EHX_MAX_DOCUMENT_MB")
                .unwrap_or_else(|_| "200".into())
                .parse()
                .unwrap_or(200),
        }
    }

    pub fn with_parallel_fan_out(mut self, parallel: bool) -> Self {
        self.parallel_fan_out = parallel;
        self
    }

    pub fn with_max_document_mb(mut self, max_mb: usize) -> Self {
        self.max_document_mb = max_mb;
        self
    }

    /// Maximum document size in bytes.
    pub fn max_document_bytes(&self) -> usize {
        self.max_document_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_values() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" ON "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn setters_override() {
        let config = PipelineConfig::from_env()
            .with_parallel_fan_out(false)
            .with_max_document_mb(1);
        assert!(!config.parallel_fan_out);
        assert_eq!(config.max_document_bytes(), 1024 * 1024);
    }
}
