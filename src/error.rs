//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required field was missing or a field could not be parsed.
    ///
    /// The string describes which field was at fault and is safe to show to
    /// the client.
    #[error("invalid transaction data: {0}")]
    Validation(String),

    /// A month filter that is neither "all" nor of the form "YYYY-MM".
    #[error("invalid month \"{0}\", expected \"YYYY-MM\" or \"all\"")]
    InvalidMonth(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the ID is
    /// correct and that the transaction has not already been deleted.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The CSV writer failed while exporting transactions.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// The server could not be reached.
    ///
    /// Only produced by the client, which falls back to its local snapshot
    /// when listing transactions.
    #[error("could not reach the server: {0}")]
    StoreUnavailable(String),

    /// The server responded with an error status.
    #[error("the server responded with {status}: {message}")]
    Remote {
        /// The HTTP status code of the response.
        status: u16,
        /// The message from the response body.
        message: String,
    },

    /// The client's local snapshot could not be read or written.
    #[error("could not access the local snapshot: {0}")]
    Snapshot(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::CsvError(value.to_string())
    }
}

/// The JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// A human readable description of what went wrong.
    pub message: String,
}

impl ErrorMessage {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidMonth(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::CsvError(_)
            | Error::InvalidTimezone(_)
            | Error::Snapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let message = match self {
            Error::Validation(_) | Error::InvalidMonth(_) => self.to_string(),
            Error::NotFound => "Transaction not found".to_owned(),
            Error::InvalidTimezone(timezone) => {
                tracing::error!("Could not get local timezone \"{timezone}\"");
                format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                )
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                "Server error".to_owned()
            }
        };

        (status_code, Json(ErrorMessage::new(message))).into_response()
    }
}
