//! Serde-deserializable types matching Lambda API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::{FunctionPage, FunctionRecord};

// ============================================================================
// ListFunctions endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFunctionConfiguration {
  #[serde(rename = "FunctionName")]
  pub function_name: Option<String>,
  #[serde(rename = "Description")]
  pub description: Option<String>,
  #[serde(rename = "LastModified")]
  pub last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListFunctionsResponse {
  #[serde(rename = "Functions", default)]
  pub functions: Vec<ApiFunctionConfiguration>,
  #[serde(rename = "NextMarker")]
  pub next_marker: Option<String>,
}

// ============================================================================
// Error responses
// ============================================================================

/// Error body returned by the Lambda REST API.
///
/// Depending on where the request was rejected the code shows up as `__type`,
/// `Type` or `code`, and the message with either capitalization.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(rename = "__type", alias = "Type", alias = "code")]
  pub error_type: Option<String>,
  #[serde(alias = "Message")]
  pub message: Option<String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl ApiFunctionConfiguration {
  /// Functions without a name cannot be addressed and are dropped.
  pub fn into_record(self) -> Option<FunctionRecord> {
    Some(FunctionRecord {
      name: self.function_name.filter(|n| !n.is_empty())?,
      description: self.description.unwrap_or_default(),
      last_modified: self.last_modified.unwrap_or_default(),
    })
  }
}

impl From<ApiListFunctionsResponse> for FunctionPage {
  fn from(response: ApiListFunctionsResponse) -> Self {
    FunctionPage {
      functions: response
        .functions
        .into_iter()
        .filter_map(ApiFunctionConfiguration::into_record)
        .collect(),
      // An empty marker is as good as none
      next_marker: response.next_marker.filter(|m| !m.is_empty()),
    }
  }
}
