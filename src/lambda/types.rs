use serde::{Deserialize, Serialize};

/// A Lambda function as listed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub last_modified: String,
}

/// All functions of one account/region, in API return order
pub type FunctionCollection = Vec<FunctionRecord>;

/// One page of a `ListFunctions` traversal
#[derive(Debug, Clone, Default)]
pub struct FunctionPage {
  pub functions: Vec<FunctionRecord>,
  /// Marker for the next page, absent on the last one
  pub next_marker: Option<String>,
}

/// A function as handed to the output layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentedFunction {
  pub id: String,
  pub display_name: String,
  pub description: String,
  pub last_modified: String,
  pub url: String,
}

impl PresentedFunction {
  pub fn new(record: &FunctionRecord, region: &str) -> Self {
    Self {
      id: record.name.clone(),
      display_name: record.name.clone(),
      description: record.description.clone(),
      last_modified: record.last_modified.clone(),
      url: console_url(region, &record.name),
    }
  }
}

/// Deep link to the function in the AWS console
pub fn console_url(region: &str, function_name: &str) -> String {
  format!(
    "https://{region}.console.aws.amazon.com/lambda/home?region={region}#/functions/{function_name}"
  )
}
