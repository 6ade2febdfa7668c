use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that stop tamperscan before (or after) a scan runs.
///
/// Probe failures never show up here: they are recovered inside each
/// check and reported as `CheckStatus::Error`.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Duplicate check name: {0}")]
    DuplicateCheck(String),

    #[error("Invalid check name '{0}' (expected lowercase letters, digits and '-')")]
    InvalidCheckName(String),

    #[error("Invalid indicator in check {check}: {message}")]
    InvalidIndicator { check: String, message: String },

    #[error("Unknown check: {0}")]
    UnknownCheck(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ScanError {
    pub fn exit_code(&self) -> i32 {
        2
    }

    /// Whether this error was raised while building the registry or
    /// loading configuration, i.e. before any check ran.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCheck(_)
                | Self::InvalidCheckName(_)
                | Self::InvalidIndicator { .. }
                | Self::UnknownCheck(_)
                | Self::Config(_)
                | Self::Toml(_)
        )
    }
}
