use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

use crate::functions::serializer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionsErrorCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl FunctionsErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionsErrorCode::Ok => "functions/ok",
            FunctionsErrorCode::Cancelled => "functions/cancelled",
            FunctionsErrorCode::Unknown => "functions/unknown",
            FunctionsErrorCode::InvalidArgument => "functions/invalid-argument",
            FunctionsErrorCode::DeadlineExceeded => "functions/deadline-exceeded",
            FunctionsErrorCode::NotFound => "functions/not-found",
            FunctionsErrorCode::AlreadyExists => "functions/already-exists",
            FunctionsErrorCode::PermissionDenied => "functions/permission-denied",
            FunctionsErrorCode::ResourceExhausted => "functions/resource-exhausted",
            FunctionsErrorCode::FailedPrecondition => "functions/failed-precondition",
            FunctionsErrorCode::Aborted => "functions/aborted",
            FunctionsErrorCode::OutOfRange => "functions/out-of-range",
            FunctionsErrorCode::Unimplemented => "functions/unimplemented",
            FunctionsErrorCode::Internal => "functions/internal",
            FunctionsErrorCode::Unavailable => "functions/unavailable",
            FunctionsErrorCode::DataLoss => "functions/data-loss",
            FunctionsErrorCode::Unauthenticated => "functions/unauthenticated",
        }
    }

    /// The bare code name (`"unauthenticated"`), used as the default error message.
    pub fn name(&self) -> &'static str {
        self.as_str().trim_start_matches("functions/")
    }

    /// Maps an HTTP status to the canonical code returned by callable backends. Any 2xx
    /// status is `Ok`.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200..=299 => FunctionsErrorCode::Ok,
            0 => FunctionsErrorCode::Internal,
            400 => FunctionsErrorCode::InvalidArgument,
            401 => FunctionsErrorCode::Unauthenticated,
            403 => FunctionsErrorCode::PermissionDenied,
            404 => FunctionsErrorCode::NotFound,
            409 => FunctionsErrorCode::Aborted,
            429 => FunctionsErrorCode::ResourceExhausted,
            499 => FunctionsErrorCode::Cancelled,
            500 => FunctionsErrorCode::Internal,
            501 => FunctionsErrorCode::Unimplemented,
            503 => FunctionsErrorCode::Unavailable,
            504 => FunctionsErrorCode::DeadlineExceeded,
            _ => FunctionsErrorCode::Unknown,
        }
    }

    /// Parses the upper snake case status names carried in `error.status` of a response body.
    pub fn from_status_name(name: &str) -> Option<Self> {
        let code = match name {
            "OK" => FunctionsErrorCode::Ok,
            "CANCELLED" => FunctionsErrorCode::Cancelled,
            "UNKNOWN" => FunctionsErrorCode::Unknown,
            "INVALID_ARGUMENT" => FunctionsErrorCode::InvalidArgument,
            "DEADLINE_EXCEEDED" => FunctionsErrorCode::DeadlineExceeded,
            "NOT_FOUND" => FunctionsErrorCode::NotFound,
            "ALREADY_EXISTS" => FunctionsErrorCode::AlreadyExists,
            "PERMISSION_DENIED" => FunctionsErrorCode::PermissionDenied,
            "RESOURCE_EXHAUSTED" => FunctionsErrorCode::ResourceExhausted,
            "FAILED_PRECONDITION" => FunctionsErrorCode::FailedPrecondition,
            "ABORTED" => FunctionsErrorCode::Aborted,
            "OUT_OF_RANGE" => FunctionsErrorCode::OutOfRange,
            "UNIMPLEMENTED" => FunctionsErrorCode::Unimplemented,
            "INTERNAL" => FunctionsErrorCode::Internal,
            "UNAVAILABLE" => FunctionsErrorCode::Unavailable,
            "DATA_LOSS" => FunctionsErrorCode::DataLoss,
            "UNAUTHENTICATED" => FunctionsErrorCode::Unauthenticated,
            _ => return None,
        };
        Some(code)
    }
}

impl Display for FunctionsErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionsError {
    pub code: FunctionsErrorCode,
    message: String,
    details: Option<JsonValue>,
}

impl FunctionsError {
    pub fn new(code: FunctionsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Extra data the backend attached to the error, already decoded.
    pub fn details(&self) -> Option<&JsonValue> {
        self.details.as_ref()
    }
}

impl Display for FunctionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for FunctionsError {}

pub type FunctionsResult<T> = Result<T, FunctionsError>;

pub fn invalid_argument(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::Internal, message)
}

pub fn unauthenticated(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::Unauthenticated, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::DeadlineExceeded, message)
}

pub fn unavailable(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::Unavailable, message)
}

pub fn cancelled(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::Cancelled, message)
}

/// Builds the error described by a callable HTTP response, if any.
///
/// The HTTP status provides the initial code. A JSON body of the form
/// `{"error": {"status": "...", "message": "...", "details": ...}}` refines it, as does the
/// older `{"error": "STATUS"}` form. A recognised status also becomes the default message;
/// an unrecognised one is reported as `internal`, and a `status` that is not a string is
/// ignored. Returns `None` when the response represents success.
pub fn error_for_http_response(status: u16, body: Option<&JsonValue>) -> Option<FunctionsError> {
    let mut code = FunctionsErrorCode::from_http_status(status);
    let mut message: Option<String> = None;
    let mut details: Option<JsonValue> = None;

    if let Some(error) = body.and_then(|value| value.get("error")) {
        let body_status = match error {
            JsonValue::String(name) => Some(name.as_str()),
            _ => error.get("status").and_then(JsonValue::as_str),
        };
        if let Some(name) = body_status {
            match FunctionsErrorCode::from_status_name(name) {
                Some(parsed) => {
                    code = parsed;
                    message = Some(name.to_string());
                }
                None => return Some(internal_error("internal")),
            }
        }

        if let Some(JsonValue::String(text)) = error.get("message") {
            message = Some(text.clone());
        }

        if let Some(raw) = error.get("details") {
            details = serializer::decode(raw.clone()).ok();
        }
    }

    if code == FunctionsErrorCode::Ok {
        return None;
    }

    let mut error = FunctionsError::new(code, message.unwrap_or_else(|| code.name().to_string()));
    if let Some(details) = details {
        error = error.with_details(details);
    }
    Some(error)
}
