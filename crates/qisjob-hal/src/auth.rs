//! Credential lookup shared by the cloud adapters.
//!
//! Tokens come from, in order: explicit configuration, an environment
//! variable, then a JSON file under the user's home directory.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{HalError, HalResult};

/// An API token and the endpoint it is valid for.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub url: Option<String>,
    /// Account instance, e.g. `hub/group/project`.
    pub instance: Option<String>,
}

impl Credentials {
    /// A bare token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: None,
            instance: None,
        }
    }

    /// Set the endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the account instance.
    #[must_use]
    pub fn with_instance(mut self, instance: Option<String>) -> Self {
        self.instance = instance;
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .field("url", &self.url)
            .field("instance", &self.instance)
            .finish()
    }
}

/// A non-empty environment variable.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// A path relative to the home directory.
pub fn home_path(relative: impl AsRef<Path>) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(relative))
}

/// Parse a JSON credentials file; a missing file is `Ok(None)`.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> HalResult<Option<T>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no credentials file");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&text).map(Some).map_err(|e| {
        HalError::AuthenticationFailed(format!("malformed {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct TokenFile {
        token: String,
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::new("s3cret").with_url("https://example.com");
        let shown = format!("{creds:?}");
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("example.com"));
    }

    #[test]
    fn test_read_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(read_json_file::<TokenFile>(&path).unwrap().is_none());

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{"token": "abc"}}"#).unwrap();
        let parsed: TokenFile = read_json_file(&path).unwrap().unwrap();
        assert_eq!(parsed.token, "abc");

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            read_json_file::<TokenFile>(&path),
            Err(HalError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_env_var_ignores_blank() {
        assert_eq!(env_var("QISJOB_HAL_TEST_SURELY_UNSET_VAR"), None);
    }
}
