use fwmap_header::DEFAULT_MAX_FILE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for mapping generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Firmware family, e.g. `marlin` or `th3d`
    pub firmware: String,

    /// Firmware version label, e.g. `2.1.x`
    pub version: String,

    /// Root of the output tree (`<output_dir>/<firmware>/<version>/...`)
    pub output_dir: PathBuf,

    /// Line budget per written part
    pub max_lines: usize,

    /// Lines reserved for document metadata in every part
    pub header_overhead: usize,

    /// Categories with more fields than this are chunked
    pub large_category_threshold: usize,

    /// Fields per chunk of a large category
    pub chunk_size: usize,

    /// Maximum header size to read (in bytes)
    pub max_file_size: usize,

    /// Attach UI field identifiers to the core set
    pub bind_ui: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            firmware: "marlin".to_string(),
            version: "2.1.x".to_string(),
            output_dir: PathBuf::from("assets/data/maps"),
            max_lines: 900,
            header_overhead: 50,
            large_category_threshold: 50,
            chunk_size: 30,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            bind_ui: true,
        }
    }
}

impl MappingConfig {
    /// Create config for a firmware/version pair with default limits
    pub fn new(firmware: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            firmware: firmware.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the line budget per part
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Set maximum header size
    pub fn with_max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn with_ui_binding(mut self, bind_ui: bool) -> Self {
        self.bind_ui = bind_ui;
        self
    }

    /// Directory that receives output for this firmware/version
    pub fn version_dir(&self) -> PathBuf {
        self.output_dir.join(&self.firmware).join(&self.version)
    }

    /// `$schema` value written into every document
    pub fn schema_title(&self) -> String {
        format!("{} Configuration Field Mapping", capitalize(&self.firmware))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.firmware.trim().is_empty() {
            return Err("firmware must not be empty".to_string());
        }

        if self.version.trim().is_empty() {
            return Err("version must not be empty".to_string());
        }

        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }

        if self.max_lines <= self.header_overhead {
            return Err(format!(
                "max_lines ({}) must exceed header_overhead ({})",
                self.max_lines, self.header_overhead
            ));
        }

        if self.max_file_size == 0 {
            return Err("max_file_size must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Upper-case the first character and lower-case the rest
pub(crate) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MappingConfig::default();
        assert_eq!(config.max_lines, 900);
        assert_eq!(config.header_overhead, 50);
        assert_eq!(config.large_category_threshold, 50);
        assert_eq!(config.chunk_size, 30);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_paths() {
        let config = MappingConfig::new("th3d", "2.97a")
            .with_output_dir("out")
            .with_max_lines(400)
            .with_ui_binding(false);

        assert_eq!(config.version_dir(), PathBuf::from("out/th3d/2.97a"));
        assert_eq!(config.schema_title(), "Th3d Configuration Field Mapping");
        assert_eq!(config.max_lines, 400);
        assert!(!config.bind_ui);
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let config = MappingConfig::default().with_max_lines(50);
        assert!(config.validate().is_err());

        let config = MappingConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(MappingConfig::new("", "1.0").validate().is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("marlin"), "Marlin");
        assert_eq!(capitalize("TH3D"), "Th3d");
        assert_eq!(capitalize(""), "");
    }
}
