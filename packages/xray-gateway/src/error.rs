//! Error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// Which access predicate rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Source address is not the allow-listed one.
    Ip,
    /// Missing, malformed or wrong bearer token.
    Token,
}

/// Gateway error type.
///
/// Every variant maps to exactly one HTTP status and a short plain-text
/// body. Detail strings are for logs only and never reach the caller.
#[derive(Debug)]
pub enum Error {
    /// Startup configuration error.
    Config(String),
    /// Request rejected by the access gate.
    AccessDenied(Denial),
    /// Config document could not be read from storage.
    NotReadable(String),
    /// `Content-Type` was not exactly `application/json`.
    UnsupportedMediaType(String),
    /// Body is not JSON, or its top level is not an object.
    MalformedDocument(String),
    /// Document object lacks a required top-level key.
    IncompleteDocument(&'static str),
    /// Config document could not be written to storage.
    NotWritable(String),
    /// Provisioning request body is invalid JSON or misses a required field.
    InvalidRequest(InvalidRequest),
    /// Could not open a channel to the backend management service.
    ConnectFailed(String),
    /// Backend rejected or failed the provisioning operation.
    ProvisioningFailed(String),
}

/// Reason a provisioning request body was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRequest {
    Json(String),
    MissingField(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::AccessDenied(Denial::Ip) => write!(f, "access denied: source address"),
            Error::AccessDenied(Denial::Token) => write!(f, "access denied: bearer token"),
            Error::NotReadable(msg) => write!(f, "config not readable: {msg}"),
            Error::UnsupportedMediaType(ct) => write!(f, "unsupported content type: {ct:?}"),
            Error::MalformedDocument(msg) => write!(f, "malformed document: {msg}"),
            Error::IncompleteDocument(key) => write!(f, "incomplete document: missing '{key}'"),
            Error::NotWritable(msg) => write!(f, "config not writable: {msg}"),
            Error::InvalidRequest(InvalidRequest::Json(msg)) => {
                write!(f, "invalid request: {msg}")
            }
            Error::InvalidRequest(InvalidRequest::MissingField(field)) => {
                write!(f, "invalid request: missing field '{field}'")
            }
            Error::ConnectFailed(msg) => write!(f, "backend connect failed: {msg}"),
            Error::ProvisioningFailed(msg) => write!(f, "provisioning failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// HTTP status this error is surfaced as.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::AccessDenied(Denial::Ip) => StatusCode::FORBIDDEN,
            Error::AccessDenied(Denial::Token) => StatusCode::UNAUTHORIZED,
            Error::UnsupportedMediaType(_)
            | Error::MalformedDocument(_)
            | Error::IncompleteDocument(_)
            | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Config(_)
            | Error::NotReadable(_)
            | Error::NotWritable(_)
            | Error::ConnectFailed(_)
            | Error::ProvisioningFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing body. Never includes internal detail.
    fn public_message(&self) -> String {
        match self {
            Error::Config(_) => "Internal configuration error".into(),
            Error::AccessDenied(Denial::Ip) => "Forbidden".into(),
            Error::AccessDenied(Denial::Token) => "Unauthorized".into(),
            Error::NotReadable(_) => "Failed to read config".into(),
            Error::UnsupportedMediaType(_) => "Content-Type must be application/json".into(),
            Error::MalformedDocument(_) => "Invalid JSON format".into(),
            Error::IncompleteDocument(key) => format!("Missing '{key}' in config"),
            Error::NotWritable(_) => "Failed to write config".into(),
            Error::InvalidRequest(InvalidRequest::Json(_)) => "Invalid JSON".into(),
            Error::InvalidRequest(InvalidRequest::MissingField(_)) => "Missing fields".into(),
            Error::ConnectFailed(_) => "Backend connect failed".into(),
            Error::ProvisioningFailed(_) => "Provisioning failed".into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
