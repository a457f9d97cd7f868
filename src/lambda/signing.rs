//! AWS Signature Version 4 request signing.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

use super::error::LambdaError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Everything except the RFC 3986 unreserved characters gets encoded.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'~');

/// Static credentials for signing.
#[derive(Clone)]
pub struct Credentials {
  pub access_key_id: String,
  pub secret_access_key: String,
  pub session_token: Option<String>,
}

impl Credentials {
  /// Read credentials from the standard AWS environment variables.
  pub fn from_env() -> Result<Self, LambdaError> {
    let access_key_id = non_empty_env("AWS_ACCESS_KEY_ID")
      .ok_or_else(|| LambdaError::MissingCredentials("AWS_ACCESS_KEY_ID is not set".into()))?;
    let secret_access_key = non_empty_env("AWS_SECRET_ACCESS_KEY")
      .ok_or_else(|| LambdaError::MissingCredentials("AWS_SECRET_ACCESS_KEY is not set".into()))?;

    Ok(Self {
      access_key_id,
      secret_access_key,
      session_token: non_empty_env("AWS_SESSION_TOKEN"),
    })
  }
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("access_key_id", &self.access_key_id)
      .field("session_token", &self.session_token.is_some())
      .finish_non_exhaustive()
  }
}

fn non_empty_env(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// A GET request to be signed.
pub struct SigningRequest<'a> {
  pub host: &'a str,
  pub path: &'a str,
  /// Unencoded query parameters, in any order
  pub query: &'a [(&'a str, &'a str)],
  pub region: &'a str,
  pub service: &'a str,
}

/// Headers to attach to the signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
  pub authorization: String,
  pub amz_date: String,
  pub security_token: Option<String>,
}

/// Encode query parameters in canonical form: sorted and percent-encoded.
pub fn canonical_query(query: &[(&str, &str)]) -> String {
  let mut pairs: Vec<(String, String)> = query
    .iter()
    .map(|(k, v)| {
      (
        utf8_percent_encode(k, QUERY_ENCODE_SET).to_string(),
        utf8_percent_encode(v, QUERY_ENCODE_SET).to_string(),
      )
    })
    .collect();
  pairs.sort();

  pairs
    .iter()
    .map(|(k, v)| format!("{}={}", k, v))
    .collect::<Vec<_>>()
    .join("&")
}

/// Sign a GET request with an empty body.
pub fn sign(
  request: &SigningRequest<'_>,
  credentials: &Credentials,
  now: DateTime<Utc>,
) -> SignedHeaders {
  let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
  let date = now.format("%Y%m%d").to_string();

  let mut headers = vec![
    ("host", request.host.to_string()),
    ("x-amz-date", amz_date.clone()),
  ];
  if let Some(token) = &credentials.session_token {
    headers.push(("x-amz-security-token", token.clone()));
  }
  headers.sort_by(|a, b| a.0.cmp(b.0));

  let canonical_headers: String = headers
    .iter()
    .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
    .collect();
  let signed_headers = headers
    .iter()
    .map(|(name, _)| *name)
    .collect::<Vec<_>>()
    .join(";");

  let canonical_request = format!(
    "GET\n{}\n{}\n{}\n{}\n{}",
    request.path,
    canonical_query(request.query),
    canonical_headers,
    signed_headers,
    hex::encode(Sha256::digest(b"")),
  );

  let scope = format!(
    "{}/{}/{}/aws4_request",
    date, request.region, request.service
  );
  let string_to_sign = format!(
    "{}\n{}\n{}\n{}",
    ALGORITHM,
    amz_date,
    scope,
    hex::encode(Sha256::digest(canonical_request.as_bytes())),
  );

  let key = signing_key(
    &credentials.secret_access_key,
    &date,
    request.region,
    request.service,
  );
  let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

  SignedHeaders {
    authorization: format!(
      "{} Credential={}/{}, SignedHeaders={}, Signature={}",
      ALGORITHM, credentials.access_key_id, scope, signed_headers, signature
    ),
    amz_date,
    security_token: credentials.session_token.clone(),
  }
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
  let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes());
  let k_region = hmac(&k_date, region.as_bytes());
  let k_service = hmac(&k_region, service.as_bytes());
  hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
  let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
  mac.update(data);
  mac.finalize().into_bytes().to_vec()
}
