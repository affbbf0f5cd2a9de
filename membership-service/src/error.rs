use error_common::{codes, ClassifiedError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MembershipError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Benefit rule violation: {0}")]
    BenefitRule(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Benefit processing already in progress for category {0}")]
    ProcessingInProgress(i64),

    #[error("Downstream error: {0}")]
    Downstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type MembershipResult<T> = Result<T, MembershipError>;

impl MembershipError {
    /// Message without the variant prefix, as shown to API callers
    pub fn message(&self) -> String {
        match self {
            MembershipError::Validation(msg)
            | MembershipError::BenefitRule(msg)
            | MembershipError::NotFound(msg)
            | MembershipError::Conflict(msg)
            | MembershipError::Downstream(msg)
            | MembershipError::Storage(msg)
            | MembershipError::Config(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl ClassifiedError for MembershipError {
    fn kind(&self) -> ErrorKind {
        match self {
            MembershipError::Validation(_) | MembershipError::BenefitRule(_) => ErrorKind::Validation,
            MembershipError::NotFound(_) => ErrorKind::NotFound,
            MembershipError::Conflict(_) | MembershipError::ProcessingInProgress(_) => ErrorKind::Conflict,
            MembershipError::Downstream(_) | MembershipError::Network(_) => ErrorKind::Downstream,
            MembershipError::Storage(_) => ErrorKind::Database,
            MembershipError::Config(_) => ErrorKind::Configuration,
            MembershipError::Serialization(_) => ErrorKind::Internal,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            MembershipError::Validation(_) => codes::validation::INVALID_INPUT,
            MembershipError::BenefitRule(_) => codes::validation::BENEFIT_RULE_VIOLATION,
            MembershipError::NotFound(_) => codes::resource::NOT_FOUND,
            MembershipError::Conflict(_) => codes::resource::ALREADY_EXISTS,
            MembershipError::ProcessingInProgress(_) => codes::resource::PROCESSING_IN_PROGRESS,
            MembershipError::Downstream(_) => codes::downstream::REJECTED,
            MembershipError::Network(_) => codes::downstream::REQUEST_FAILED,
            MembershipError::Storage(_) => codes::database::QUERY_FAILED,
            MembershipError::Config(_) => codes::system::CONFIGURATION,
            MembershipError::Serialization(_) => codes::system::INTERNAL,
        }
    }

    fn public_message(&self) -> String {
        self.message()
    }
}

impl From<sqlx::Error> for MembershipError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => MembershipError::NotFound("Requested record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                MembershipError::Conflict(format!("A record with these details already exists: {}", db.message()))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                MembershipError::Validation(format!("Referenced record does not exist: {}", db.message()))
            }
            _ => MembershipError::Storage(error.to_string()),
        }
    }
}

impl From<config::ConfigError> for MembershipError {
    fn from(error: config::ConfigError) -> Self {
        MembershipError::Config(error.to_string())
    }
}

impl From<validator::ValidationErrors> for MembershipError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
                })
            })
            .collect();
        messages.sort();
        MembershipError::Validation(messages.join("; "))
    }
}
