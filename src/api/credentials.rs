//! API credentials: key id, private signing key and base URL.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use super::signer::{Signer, SignerError};

pub const DEFAULT_BASE_URL: &str = "https://api.elections.kalshi.com";

/// Credentials for one Kalshi API key. Immutable once loaded.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    private_key_pem: String,
    pub base_url: String,
}

/// On-disk layout of a `kalshi-config.json` credential file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsFile {
    api_key: String,
    #[serde(default)]
    private_key_pem: Option<String>,
    #[serde(default)]
    private_key_path: Option<PathBuf>,
    #[serde(default)]
    base_url: Option<String>,
}

impl Credentials {
    pub fn new(api_key: String, private_key_pem: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            api_key,
            private_key_pem,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Load from a JSON file with `apiKey`, `privateKeyPem` or
    /// `privateKeyPath`, and an optional `baseUrl`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        let file: CredentialsFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse credentials file {}", path.display()))?;

        let pem = match (file.private_key_pem, file.private_key_path) {
            (Some(pem), _) => pem,
            (None, Some(key_path)) => {
                let key_path = if key_path.is_relative() {
                    path.parent().unwrap_or(Path::new(".")).join(key_path)
                } else {
                    key_path
                };
                read_key_file(&key_path)?
            }
            (None, None) => bail!("Credentials file must set privateKeyPem or privateKeyPath"),
        };

        Ok(Self::new(file.api_key, pem, file.base_url))
    }

    /// Create from environment variables:
    /// - KALSHI_API_KEY
    /// - KALSHI_PRIVATE_KEY_PEM or KALSHI_PRIVATE_KEY_PATH
    /// - KALSHI_BASE_URL (optional)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("KALSHI_API_KEY").context("KALSHI_API_KEY not set")?;

        let pem = match std::env::var("KALSHI_PRIVATE_KEY_PEM") {
            Ok(pem) => pem.replace("\\n", "\n"),
            Err(_) => {
                let path = std::env::var("KALSHI_PRIVATE_KEY_PATH")
                    .context("KALSHI_PRIVATE_KEY_PEM or KALSHI_PRIVATE_KEY_PATH must be set")?;
                read_key_file(Path::new(&path))?
            }
        };

        let base_url = std::env::var("KALSHI_BASE_URL").ok();

        Ok(Self::new(api_key, pem, base_url))
    }

    /// Parse the private key. Malformed key material is fatal at startup.
    pub fn signer(&self) -> Result<Signer, SignerError> {
        Signer::from_pem(&self.private_key_pem)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("private_key_pem", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn read_key_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read private key {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::signer::tests::test_pem;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kalshi-copier-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_default_base_url() {
        let creds = Credentials::new("key".to_string(), String::new(), None);
        assert_eq!(creds.base_url, DEFAULT_BASE_URL);

        let creds = Credentials::new(
            "key".to_string(),
            String::new(),
            Some("https://demo-api.kalshi.co/".to_string()),
        );
        assert_eq!(creds.base_url, "https://demo-api.kalshi.co");
    }

    #[test]
    fn test_from_file_with_inline_pem() {
        let path = temp_path("inline.json");
        let body = serde_json::json!({
            "apiKey": "abc-123",
            "privateKeyPem": test_pem(),
        });
        std::fs::write(&path, body.to_string()).unwrap();

        let creds = Credentials::from_file(&path).unwrap();
        assert_eq!(creds.api_key, "abc-123");
        assert_eq!(creds.base_url, DEFAULT_BASE_URL);
        assert!(creds.signer().is_ok());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_from_file_with_relative_key_path() {
        let key_path = temp_path("key.pem");
        std::fs::write(&key_path, test_pem()).unwrap();

        let path = temp_path("by-path.json");
        let body = serde_json::json!({
            "apiKey": "abc-123",
            "privateKeyPath": key_path.file_name().unwrap().to_string_lossy(),
            "baseUrl": "https://demo-api.kalshi.co",
        });
        std::fs::write(&path, body.to_string()).unwrap();

        let creds = Credentials::from_file(&path).unwrap();
        assert_eq!(creds.base_url, "https://demo-api.kalshi.co");
        assert!(creds.signer().is_ok());

        std::fs::remove_file(path).ok();
        std::fs::remove_file(key_path).ok();
    }

    #[test]
    fn test_from_file_requires_key() {
        let path = temp_path("nokey.json");
        std::fs::write(&path, r#"{"apiKey":"abc"}"#).unwrap();

        assert!(Credentials::from_file(&path).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_debug_redacts_key() {
        let creds = Credentials::new("key".to_string(), "secret".to_string(), None);
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret"));
    }
}
