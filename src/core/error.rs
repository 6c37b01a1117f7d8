use std::error::Error as StdError;
use std::fmt;

use crate::core::render::RenderError;

/// Failure of a single conversation turn. Any of these ends the turn; there
/// is no retry or partial resume.
#[derive(Debug)]
pub enum TurnError {
    /// The request could not be sent or the body stopped mid-stream.
    Http(reqwest::Error),

    /// The backend answered with an error status or an in-stream error
    /// event.
    Api { status: u16, message: String },

    /// A stream event could not be decoded.
    Decode(serde_json::Error),

    /// Converting the response into cards failed.
    Render(RenderError),
}

fn status_reason(status: u16) -> Option<&'static str> {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::Http(err) => write!(f, "[network] {err}"),
            TurnError::Api { status, message } => match status_reason(*status) {
                Some(reason) => write!(f, "[{status} {reason}] {message}"),
                None => write!(f, "[{status}] {message}"),
            },
            TurnError::Decode(err) => write!(f, "[decode] Unexpected response from backend: {err}"),
            TurnError::Render(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for TurnError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TurnError::Http(err) => Some(err),
            TurnError::Decode(err) => Some(err),
            TurnError::Render(err) => Some(err),
            TurnError::Api { .. } => None,
        }
    }
}

impl From<reqwest::Error> for TurnError {
    fn from(err: reqwest::Error) -> Self {
        TurnError::Http(err)
    }
}

impl From<serde_json::Error> for TurnError {
    fn from(err: serde_json::Error) -> Self {
        TurnError::Decode(err)
    }
}

impl From<RenderError> for TurnError {
    fn from(err: RenderError) -> Self {
        TurnError::Render(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::markers::strip_error_code_prefix;

    #[test]
    fn api_errors_carry_a_bracketed_status_prefix() {
        let err = TurnError::Api {
            status: 400,
            message: "API key not valid".into(),
        };
        assert_eq!(err.to_string(), "[400 Bad Request] API key not valid");
        assert_eq!(strip_error_code_prefix(&err.to_string()), "API key not valid");
    }

    #[test]
    fn unknown_status_still_gets_a_prefix() {
        let err = TurnError::Api {
            status: 599,
            message: "odd".into(),
        };
        assert_eq!(err.to_string(), "[599] odd");
    }
}
