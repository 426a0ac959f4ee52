use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use soko_engine::MarketplaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("No user identity was provided with the request.")]
    Unauthenticated,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid scan, code, or task is not in the right state")]
    InvalidScan,
    #[error("Payment could not be initiated. {0}")]
    PaymentInitiationError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::PaymentInitiationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidScan => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<MarketplaceError> for ServerError {
    fn from(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::Validation(s) => Self::InvalidRequestBody(s),
            MarketplaceError::ProductNotFound(_) |
            MarketplaceError::OrderNotFound(_) |
            MarketplaceError::TaskNotFound(_) => Self::NoRecordFound(e.to_string()),
            MarketplaceError::Forbidden(s) => Self::InsufficientPermissions(s),
            MarketplaceError::OrderNotAcceptable(_) |
            MarketplaceError::TaskAlreadyExists(_) |
            MarketplaceError::TaskUnavailable => Self::Conflict(e.to_string()),
            MarketplaceError::InvalidScan => Self::InvalidScan,
            MarketplaceError::GatewayError(s) => Self::PaymentInitiationError(s),
            MarketplaceError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}
