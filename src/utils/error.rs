use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeostorError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("{message}")]
    NoData { message: String },

    #[error("Calculation error: {message}")]
    CalculationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Storage,
    Input,
    Configuration,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit status for a failed command.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Low => 0,
            Self::Medium => 2,
            Self::High => 1,
            Self::Critical => 3,
        }
    }
}

impl GeostorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DatabaseError(_) | Self::IoError(_) | Self::ZipError(_) | Self::SchemaError { .. } => {
                ErrorCategory::Storage
            }
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::NotFound { .. }
            | Self::Conflict { .. }
            | Self::ValidationError { .. } => ErrorCategory::Input,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::NoData { .. } | Self::CalculationError { .. } => ErrorCategory::Analysis,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. }
            | Self::NoData { .. }
            | Self::Conflict { .. }
            | Self::ValidationError { .. } => ErrorSeverity::Medium,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::CalculationError { .. }
            | Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorSeverity::High,
            Self::DatabaseError(_) | Self::IoError(_) | Self::ZipError(_) | Self::SchemaError { .. } => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "Check that the database file is a geostor database and is not locked",
            Self::SchemaError { .. } => "Run `geostor init --force` on a copy, or migrate the database",
            Self::CsvError(_) => "Check the CSV headers and that every row has the same number of fields",
            Self::IoError(_) => "Check that the path exists and is writable",
            Self::SerializationError(_) | Self::ZipError(_) => "Check free disk space in the output directory",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the configuration file or command line flags",
            Self::NotFound { .. } => "List the existing records to find the correct ID",
            Self::Conflict { .. } => "Use a unique name or reference, or update the existing record",
            Self::ValidationError { .. } => "Correct the input values and try again",
            Self::NoData { .. } => "Add liquid limit and plastic limit trials for the project first",
            Self::CalculationError { .. } => "Review the trial data for the affected samples",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::DatabaseError(e) => format!("The database operation failed: {}", e),
            Self::IoError(e) => format!("A file could not be read or written: {}", e),
            other => other.to_string(),
        }
    }

    /// Maps unique-constraint failures onto `Conflict` with the given message.
    pub(crate) fn from_constraint(err: rusqlite::Error, message: impl Into<String>) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::conflict(message)
            }
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Self::validation("Referenced parent record does not exist")
            }
            _ => Self::DatabaseError(err),
        }
    }
}

impl From<toml::de::Error> for GeostorError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeostorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_drives_categories() {
        let err = GeostorError::NotFound {
            entity: "Project",
            id: 7,
        };
        assert_eq!(err.to_string(), "Project with ID 7 not found");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = GeostorError::SchemaError {
            message: "Required table 'sample' not found in database".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_missing_data_exits_nonzero() {
        let err = GeostorError::NoData {
            message: "No data found for project number: NOPE-1".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.severity().exit_code(), 2);
        assert_eq!(ErrorSeverity::Critical.exit_code(), 3);
        assert_eq!(ErrorSeverity::High.exit_code(), 1);
    }

    #[test]
    fn test_constraint_violation_becomes_conflict() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err();
        let mapped = GeostorError::from_constraint(err, "duplicate");
        assert!(matches!(mapped, GeostorError::Conflict { .. }));
    }
}
