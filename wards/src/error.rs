use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Failure of a policy or assignment mutation.
///
/// Every variant is terminal for the operation that produced it; nothing in
/// this crate retries.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("not authorized: {message}")]
    Authorization { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("store error: {message}")]
    Store { message: String },
}

/// Coarse error category handed back to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Internal,
}

impl PolicyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PolicyError::Validation { .. } => ErrorKind::Validation,
            PolicyError::Authorization { .. } => ErrorKind::Authorization,
            PolicyError::NotFound { .. } => ErrorKind::NotFound,
            PolicyError::Conflict { .. } => ErrorKind::Conflict,
            PolicyError::Store { .. } => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for PolicyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => PolicyError::NotFound { entity, id },
            StoreError::Conflict { message } => PolicyError::Conflict { message },
            StoreError::Backend(message) => PolicyError::Store { message },
        }
    }
}

/// Structured result of a mutation, suitable for returning to a form or API
/// client verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> From<Result<T, PolicyError>> for MutationOutcome<T> {
    fn from(result: Result<T, PolicyError>) -> Self {
        match result {
            Ok(value) => Self {
                ok: true,
                value: Some(value),
                kind: None,
                message: None,
            },
            Err(err) => Self {
                ok: false,
                value: None,
                kind: Some(err.kind()),
                message: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_maps_to_conflict_kind() {
        let err: PolicyError = StoreError::Conflict {
            message: "scope taken".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn outcome_carries_kind_and_message() {
        let outcome: MutationOutcome<()> =
            Err(PolicyError::validation("name must not be empty")).into();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["message"], "validation failed: name must not be empty");
        assert!(json.get("value").is_none());
    }
}
