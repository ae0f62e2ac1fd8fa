use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource path on the remote API, relative to the configured base URL
/// (e.g. `/api/weddings/w-1/guests`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteTarget(String);

impl RemoteTarget {
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Remote target cannot be empty".to_string());
        }
        if !value.starts_with('/') {
            return Err(format!("Remote target must be an absolute path: {value}"));
        }
        if value.contains("://") || value.chars().any(char::is_whitespace) {
            return Err(format!("Remote target must be a bare path: {value}"));
        }
        Ok(())
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RemoteTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RemoteTarget> for String {
    fn from(target: RemoteTarget) -> Self {
        target.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_paths_and_rejects_urls() {
        assert!(RemoteTarget::new("/api/guests/g-1").is_ok());
        assert!(RemoteTarget::new("").is_err());
        assert!(RemoteTarget::new("api/guests").is_err());
        assert!(RemoteTarget::new("/https://evil").is_err());
        assert!(RemoteTarget::new("/api/guests 1").is_err());
    }
}
