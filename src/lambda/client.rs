use async_trait::async_trait;
use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::lambda::api_types::ApiListFunctionsResponse;
use crate::lambda::error::LambdaError;
use crate::lambda::fetcher::FunctionsApi;
use crate::lambda::signing::{self, canonical_query, Credentials, SigningRequest};
use crate::lambda::types::FunctionPage;

const API_VERSION_PATH: &str = "/2015-03-31/functions/";
const SERVICE: &str = "lambda";

/// Lambda API client wrapper
#[derive(Clone)]
pub struct LambdaClient {
  http: reqwest::Client,
  endpoint: Url,
  region: String,
  page_size: u32,
}

impl LambdaClient {
  pub fn new(config: &Config) -> Result<Self> {
    let endpoint = match &config.aws.endpoint {
      Some(e) => e.clone(),
      None => format!("https://lambda.{}.amazonaws.com", config.aws.region),
    };
    let endpoint =
      Url::parse(&endpoint).map_err(|e| eyre!("Invalid Lambda endpoint {}: {}", endpoint, e))?;
    if endpoint.host_str().is_none() {
      return Err(eyre!("Lambda endpoint {} has no host", endpoint));
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("l9s/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      endpoint,
      region: config.aws.region.clone(),
      page_size: config.cache.page_size,
    })
  }

  /// Host header value, including a non-default port
  fn host(&self) -> String {
    let host = self.endpoint.host_str().unwrap_or_default();
    match self.endpoint.port() {
      Some(port) => format!("{}:{}", host, port),
      None => host.to_string(),
    }
  }

  /// List one page of functions, starting at `marker`
  pub async fn list_functions(&self, marker: Option<&str>) -> Result<FunctionPage, LambdaError> {
    let credentials = Credentials::from_env()?;

    let page_size = self.page_size.to_string();
    let mut query = vec![("MaxItems", page_size.as_str())];
    if let Some(m) = marker {
      query.push(("Marker", m));
    }

    let host = self.host();
    let signed = signing::sign(
      &SigningRequest {
        host: &host,
        path: API_VERSION_PATH,
        query: &query,
        region: &self.region,
        service: SERVICE,
      },
      &credentials,
      Utc::now(),
    );

    let mut url = self.endpoint.clone();
    url.set_path(API_VERSION_PATH);
    url.set_query(Some(&canonical_query(&query)));

    let mut request = self
      .http
      .get(url)
      .header("authorization", signed.authorization)
      .header("x-amz-date", signed.amz_date);
    if let Some(token) = signed.security_token {
      request = request.header("x-amz-security-token", token);
    }

    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
      let error_type = response
        .headers()
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
      let body = response.text().await.unwrap_or_default();
      return Err(LambdaError::from_response(
        status.as_u16(),
        error_type.as_deref(),
        &body,
      ));
    }

    let body = response.bytes().await?;
    let parsed: ApiListFunctionsResponse =
      serde_json::from_slice(&body).map_err(|e| LambdaError::Decode(e.to_string()))?;
    let page = FunctionPage::from(parsed);

    debug!(
      count = page.functions.len(),
      first = page.functions.first().map(|f| f.name.as_str()).unwrap_or(""),
      more = page.next_marker.is_some(),
      "loaded functions page"
    );

    Ok(page)
  }
}

#[async_trait]
impl FunctionsApi for LambdaClient {
  async fn list_page(&self, marker: Option<&str>) -> Result<FunctionPage, LambdaError> {
    self.list_functions(marker).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{AwsConfig, CacheConfig};

  fn config_with_endpoint(endpoint: Option<&str>) -> Config {
    Config {
      aws: AwsConfig {
        profile: "default".to_string(),
        region: "eu-central-1".to_string(),
        endpoint: endpoint.map(String::from),
      },
      cache: CacheConfig::default(),
    }
  }

  #[test]
  fn test_default_endpoint_from_region() {
    let client = LambdaClient::new(&config_with_endpoint(None)).unwrap();
    assert_eq!(client.host(), "lambda.eu-central-1.amazonaws.com");
  }

  #[test]
  fn test_endpoint_override_keeps_port() {
    let client = LambdaClient::new(&config_with_endpoint(Some("http://localhost:4566"))).unwrap();
    assert_eq!(client.host(), "localhost:4566");
  }

  #[test]
  fn test_invalid_endpoint() {
    assert!(LambdaClient::new(&config_with_endpoint(Some("not a url"))).is_err());
  }
}
