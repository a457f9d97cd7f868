use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub aws: AwsConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
  /// Profile name; namespaces the cache
  #[serde(default = "default_profile")]
  pub profile: String,
  #[serde(default = "default_region")]
  pub region: String,
  /// Custom API endpoint (e.g. a local emulator) instead of the regional one
  pub endpoint: Option<String>,
}

impl Default for AwsConfig {
  fn default() -> Self {
    Self {
      profile: default_profile(),
      region: default_region(),
      endpoint: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Minutes before the cached listing is refreshed from the API
  #[serde(default = "default_ttl_minutes")]
  pub ttl_minutes: u32,
  /// Upper bound on pages fetched per listing
  #[serde(default = "default_max_pages")]
  pub max_pages: usize,
  /// Functions requested per page
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_minutes: default_ttl_minutes(),
      max_pages: default_max_pages(),
      page_size: default_page_size(),
    }
  }
}

fn default_profile() -> String {
  env_var("AWS_PROFILE").unwrap_or_else(|| "default".to_string())
}

fn default_region() -> String {
  env_var("AWS_REGION")
    .or_else(|| env_var("AWS_DEFAULT_REGION"))
    .unwrap_or_else(|| "us-east-1".to_string())
}

fn default_ttl_minutes() -> u32 {
  30
}

fn default_max_pages() -> usize {
  100
}

fn default_page_size() -> u32 {
  50
}

fn env_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./l9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/l9s/config.yaml
  ///
  /// Without any file the defaults (and AWS environment variables) apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("l9s.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("l9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  pub fn validate(&self) -> Result<()> {
    if self.aws.profile.trim().is_empty() {
      return Err(eyre!("aws.profile must not be empty"));
    }
    if self.aws.region.trim().is_empty() {
      return Err(eyre!("aws.region must not be empty"));
    }
    if self.cache.max_pages == 0 {
      return Err(eyre!("cache.max_pages must be at least 1"));
    }
    if !(1..=50).contains(&self.cache.page_size) {
      return Err(eyre!("cache.page_size must be between 1 and 50"));
    }
    Ok(())
  }

  /// Cache time-to-live as a duration
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::minutes(i64::from(self.cache.ttl_minutes))
  }
}

/// Directory for the cache database and log files.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("l9s"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
aws:
  profile: work
  region: eu-west-1
  endpoint: http://localhost:4566
cache:
  ttl_minutes: 5
  max_pages: 20
  page_size: 10
"#,
    )
    .unwrap();

    assert_eq!(config.aws.profile, "work");
    assert_eq!(config.aws.region, "eu-west-1");
    assert_eq!(config.aws.endpoint.as_deref(), Some("http://localhost:4566"));
    assert_eq!(config.cache.ttl_minutes, 5);
    assert_eq!(config.cache.max_pages, 20);
    assert_eq!(config.cache.page_size, 10);
    assert_eq!(config.ttl(), chrono::Duration::minutes(5));
    config.validate().unwrap();
  }

  #[test]
  fn test_partial_config_uses_defaults() {
    let config = Config::parse("aws:\n  profile: dev\n").unwrap();
    assert_eq!(config.aws.profile, "dev");
    assert_eq!(config.cache.ttl_minutes, 30);
    assert_eq!(config.cache.max_pages, 100);
    assert_eq!(config.cache.page_size, 50);
  }

  #[test]
  fn test_empty_config_is_default() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.cache.ttl_minutes, 30);
    assert!(config.aws.endpoint.is_none());
  }

  #[test]
  fn test_invalid_yaml() {
    assert!(Config::parse("cache: [").is_err());
  }

  #[test]
  fn test_validate_rejects_bad_values() {
    let mut config = Config::default();
    config.cache.max_pages = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.cache.page_size = 500;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.aws.profile = " ".to_string();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    assert!(Config::load(Some(Path::new("/nonexistent/l9s.yaml"))).is_err());
  }
}
