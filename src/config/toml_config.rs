use crate::domain::ports::ConfigProvider;
use crate::utils::error::{GeostorError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "geostor.toml";
pub const OUTPUT_FORMATS: [&str; 2] = ["csv", "json"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeostorConfig {
    pub database: DatabaseConfig,
    pub output: OutputConfig,
    pub atterberg: AtterbergSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    /// AGS abbreviation CSV loaded by `init`.
    pub ags_csv: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "geostor.db".to_string(),
            ags_csv: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
    /// Bundle analysis outputs into one zip instead of loose files.
    pub archive: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            formats: vec!["csv".to_string(), "json".to_string()],
            archive: false,
        }
    }
}

/// Tunables for the liquid/plastic limit calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtterbergSettings {
    /// Drop count at which the flow curve is read (ASTM D4318: 25).
    pub target_drops: f64,
    /// Maximum spread between paired plastic limit trials, in percent water content.
    pub plastic_limit_tolerance: f64,
    pub flow_curve_points: usize,
    /// Reject liquid limits whose trials do not cover the 15-35 drop ranges.
    pub enforce_drop_ranges: bool,
}

impl Default for AtterbergSettings {
    fn default() -> Self {
        Self {
            target_drops: 25.0,
            plastic_limit_tolerance: 1.4,
            flow_curve_points: 100,
            enforce_drop_ranges: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub file: Option<String>,
    pub json: bool,
}

impl GeostorConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` if it exists; a missing default file yields built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P, explicit: bool) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else if explicit {
            Err(GeostorError::ConfigError {
                message: format!("Configuration file not found: {}", path.display()),
            })
        } else {
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${GEOSTOR_DB})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GeostorError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("database.path", &self.database.path)?;
        if let Some(csv) = &self.database.ags_csv {
            validation::validate_file_extension("database.ags_csv", csv, &["csv"])?;
        }

        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_allowed_values("output.formats", &self.output.formats, &OUTPUT_FORMATS)?;

        validation::validate_range("atterberg.target_drops", self.atterberg.target_drops, 15.0, 35.0)?;
        validation::validate_range(
            "atterberg.plastic_limit_tolerance",
            self.atterberg.plastic_limit_tolerance,
            0.0,
            100.0,
        )?;
        validation::validate_positive_number(
            "atterberg.flow_curve_points",
            self.atterberg.flow_curve_points,
            2,
        )?;

        if let Some(level) = &self.logging.level {
            let levels = ["trace", "debug", "info", "warn", "error"];
            validation::validate_allowed_values("logging.level", std::slice::from_ref(level), &levels)?;
        }

        Ok(())
    }
}

impl ConfigProvider for GeostorConfig {
    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn archive_enabled(&self) -> bool {
        self.output.archive
    }

    fn atterberg(&self) -> &AtterbergSettings {
        &self.atterberg
    }
}

impl Validate for GeostorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[database]
path = "site.db"
ags_csv = "AGS_abbreviations.csv"

[output]
path = "./reports"
formats = ["csv"]
archive = true

[atterberg]
target_drops = 25
plastic_limit_tolerance = 2.0
flow_curve_points = 50

[logging]
level = "debug"
file = "logs/geostor.log"
"#;

        let config = GeostorConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.database.path, "site.db");
        assert_eq!(config.output.formats, vec!["csv".to_string()]);
        assert!(config.archive_enabled());
        assert_eq!(config.atterberg.flow_curve_points, 50);
        assert!(config.atterberg.enforce_drop_ranges);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = GeostorConfig::from_toml_str("").unwrap();
        assert_eq!(config, GeostorConfig::default());
        assert_eq!(config.atterberg.target_drops, 25.0);
        assert_eq!(config.atterberg.plastic_limit_tolerance, 1.4);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GEOSTOR_TEST_DB_PATH", "/tmp/from-env.db");

        let toml_content = r#"
[database]
path = "${GEOSTOR_TEST_DB_PATH}"
"#;

        let config = GeostorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.database.path, "/tmp/from-env.db");

        std::env::remove_var("GEOSTOR_TEST_DB_PATH");
    }

    #[test]
    fn test_config_validation() {
        let config = GeostorConfig::from_toml_str(
            r#"
[output]
formats = ["xlsx"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = GeostorConfig::from_toml_str(
            r#"
[atterberg]
flow_curve_points = 1
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = GeostorConfig::from_toml_str("[database\npath = 1").unwrap_err();
        assert!(matches!(err, GeostorError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[output]\npath = \"./file-test\"\n")
            .unwrap();

        let config = GeostorConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.path, "./file-test");
    }

    #[test]
    fn test_load_or_default() {
        let missing = std::path::Path::new("/nonexistent/geostor.toml");
        assert!(GeostorConfig::load_or_default(missing, false).is_ok());
        assert!(GeostorConfig::load_or_default(missing, true).is_err());
    }
}
