//! Runtime settings for the `kolejka` binary.
//!
//! Loaded from an optional `config.toml` plus `KOLEJKA_`-prefixed
//! environment variables; the environment wins. The API key is a secret:
//! pass it as `KOLEJKA_API_KEY` or point `api_key_file` at a file
//! containing it.

use std::path::PathBuf;

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// HTML endpoint carrying the office list.
  #[serde(default = "default_html_url")]
  pub html_url: String,

  /// JSON queue-status endpoint.
  #[serde(default = "default_json_url")]
  pub json_url: String,

  /// Upstream API key. Prefer `api_key_file` in config files so the
  /// secret never lands in one.
  pub api_key: Option<String>,

  /// Path to a file whose contents are the API key.
  pub api_key_file: Option<PathBuf>,

  /// SQLite cache path. Unset means a throwaway in-memory cache.
  pub cache_path: Option<PathBuf>,

  /// Minimum seconds between network refreshes per office.
  #[serde(default = "default_cooldown_secs")]
  pub cooldown_secs: u64,

  /// Default office key for commands that omit `--office`.
  pub office_key: Option<String>,
}

fn default_html_url() -> String {
  "https://api.um.warszawa.pl/daneszcz.php?data=16c404ef084cfaffca59ef14b07dc516".into()
}

fn default_json_url() -> String {
  "https://api.um.warszawa.pl/api/action/wsstore_get/".into()
}

fn default_cooldown_secs() -> u64 {
  60
}

impl Settings {
  /// Resolve the API key from the inline setting or the secret file.
  pub fn api_key(&self) -> anyhow::Result<String> {
    if let Some(key) = &self.api_key {
      return Ok(key.trim().to_owned());
    }
    if let Some(path) = &self.api_key_file {
      let key = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read API key file {path:?}"))?;
      return Ok(key.trim().to_owned());
    }
    anyhow::bail!("no API key configured: set KOLEJKA_API_KEY or api_key_file")
  }
}
