use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::schemas::{Amount, MemberId};

/// Client-caused rejections of an expense or settlement draft. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("the expense must be split between at least one member")]
    EmptySplit,
    #[error("`{0}` is not a member of the group")]
    NotAGroupMember(MemberId),
    #[error("`{0}` appears more than once in the split")]
    DuplicateSplitEntry(MemberId),
    #[error("split amounts add up to {actual}, expected {expected}")]
    SplitAmountMismatch { expected: Amount, actual: Amount },
    #[error("a member cannot settle with themselves")]
    SelfSettlement,
    #[error("`{0}` must not be empty")]
    EmptyField(&'static str),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("ledger consistency violated: {0}")]
    Consistency(String),
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    fn error_type(&self) -> &str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::Forbidden(_) => "forbidden",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Consistency(_) => "consistency_error",
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::Database(_) => "database_error",
        }
    }
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
            LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Consistency(_) | LedgerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        // Storage errors can leak connection details.
        let message = match self {
            LedgerError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": message,
                "type": self.error_type(),
            }
        }))
    }
}
