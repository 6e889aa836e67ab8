use thiserror::Error;

use crate::domain::platform::Platform;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("required field `{0}` is missing or empty")]
    MissingField(&'static str),
    #[error("unknown platform `{0}` (expected reliance|pai|croma|flipkart)")]
    UnknownPlatform(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// A single platform's catalog could not be read.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("catalog for {platform} is unavailable: {message}")]
pub struct CatalogError {
    pub platform: Platform,
    pub message: String,
}

impl CatalogError {
    pub fn new(platform: Platform, message: impl Into<String>) -> Self {
        Self { platform, message: message.into() }
    }
}

/// Failure of an outbound collaborator (web search, text generation).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExternalServiceError {
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },
    #[error("{service} timed out after {timeout_secs}s")]
    Timeout { service: &'static str, timeout_secs: u64 },
    #[error("{service} request failed: {message}")]
    Request { service: &'static str, message: String },
    #[error("{service} returned an undecodable response: {message}")]
    Decode { service: &'static str, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Catalog(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
