//! Typed errors for the Lambda API boundary.

use thiserror::Error;

use super::api_types::ApiErrorBody;

/// Error codes that mean the session credentials are no longer valid.
const EXPIRED_CODES: &[&str] = &["ExpiredTokenException", "ExpiredToken"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LambdaError {
  /// The session token has expired and needs to be refreshed
  #[error("AWS credentials expired: {0}")]
  ExpiredCredentials(String),

  /// No usable credentials were found in the environment
  #[error("No AWS credentials found: {0}")]
  MissingCredentials(String),

  /// The API rejected the request
  #[error("Lambda API error {status} ({code}): {message}")]
  Api {
    status: u16,
    code: String,
    message: String,
  },

  /// The request never got a response
  #[error("Request to Lambda API failed: {0}")]
  Transport(String),

  /// The response could not be parsed
  #[error("Failed to parse Lambda API response: {0}")]
  Decode(String),

  /// The listing kept returning markers past the configured bound
  #[error("Function listing did not finish within {0} pages")]
  PageLimit(usize),
}

impl LambdaError {
  /// Classify an error response by its error code.
  ///
  /// The code comes from the `x-amzn-ErrorType` header when present (which may
  /// carry a `:namespace` suffix), otherwise from the JSON body.
  pub fn from_response(status: u16, error_type_header: Option<&str>, body: &str) -> Self {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();

    let code = error_type_header
      .and_then(|h| h.split(':').next())
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .map(String::from)
      .or(parsed.error_type)
      .unwrap_or_else(|| "Unknown".to_string());

    let message = parsed
      .message
      .unwrap_or_else(|| body.chars().take(200).collect());

    if EXPIRED_CODES.contains(&code.as_str()) {
      return Self::ExpiredCredentials(message);
    }

    Self::Api {
      status,
      code,
      message,
    }
  }

  /// Whether this failure means the session expired, as opposed to any other
  /// credential or API problem.
  pub fn is_expired_credentials(&self) -> bool {
    matches!(self, Self::ExpiredCredentials(_))
  }
}

impl From<reqwest::Error> for LambdaError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      Self::Decode(e.to_string())
    } else {
      Self::Transport(e.to_string())
    }
  }
}
