use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::{codes, ClassifiedError, ErrorKind, ServiceResult};
use membership_service::MembershipError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    /// Unique error ID for tracking
    pub error_id: String,
    pub error_type: String,
    pub code: String,
    pub msg: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] MembershipError),

    #[error("Bad request: {message}")]
    BadRequest { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Service(e) => e.kind(),
            ApiError::BadRequest { .. } => ErrorKind::Validation,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Service(MembershipError::BenefitRule(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Downstream => StatusCode::BAD_GATEWAY,
                ErrorKind::Database | ErrorKind::Configuration | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn error_type(&self) -> &'static str {
        self.kind().as_str()
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Service(e) => e.code(),
            ApiError::BadRequest { .. } => codes::validation::INVALID_FORMAT,
        }
    }

    /// Never exposes storage or configuration internals
    fn public_message(&self) -> String {
        match self {
            ApiError::Service(e) => match e.kind() {
                ErrorKind::Database | ErrorKind::Configuration | ErrorKind::Internal => {
                    "An internal error occurred".to_string()
                }
                _ => e.public_message(),
            },
            ApiError::BadRequest { message } => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        let body = ApiErrorResponse {
            success: false,
            error_id,
            error_type: self.error_type().to_string(),
            code: self.code().to_string(),
            msg: self.public_message(),
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(body)).into_response()
    }
}

/// Handler result: a `ServiceResult` body on success, an [`ApiError`] otherwise
pub type ApiResult<T> = Result<Json<ServiceResult<T>>, ApiError>;

pub fn api_success<T>(data: T) -> ApiResult<T> {
    Ok(Json(ServiceResult::success(data)))
}

pub fn api_success_with_msg<T>(data: T, msg: impl Into<String>) -> ApiResult<T> {
    Ok(Json(ServiceResult::success_with_msg(data, msg)))
}
