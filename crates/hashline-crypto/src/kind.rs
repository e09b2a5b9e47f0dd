use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::digest::{Blake3Digest, Sha256Digest, SharedDigest};

/// Digest algorithm selector, as written in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    #[default]
    Blake3,
    Sha256,
}

impl DigestKind {
    /// Instantiate the selected algorithm.
    pub fn build(self) -> SharedDigest {
        match self {
            Self::Blake3 => Arc::new(Blake3Digest),
            Self::Sha256 => Arc::new(Sha256Digest),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unrecognised algorithm name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown digest algorithm: {0}")]
pub struct UnknownDigest(pub String);

impl FromStr for DigestKind {
    type Err = UnknownDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(UnknownDigest(other.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        digest: DigestKind,
    }

    #[test]
    fn build_matches_name() {
        for kind in [DigestKind::Blake3, DigestKind::Sha256] {
            assert_eq!(kind.build().name(), kind.name());
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!("BLAKE3".parse::<DigestKind>().unwrap(), DigestKind::Blake3);
        assert_eq!("sha-256".parse::<DigestKind>().unwrap(), DigestKind::Sha256);
        assert_eq!(
            "md5".parse::<DigestKind>().unwrap_err(),
            UnknownDigest("md5".into())
        );
    }

    #[test]
    fn deserializes_lowercase() {
        let w: Wrapper = toml::from_str("digest = \"sha256\"").unwrap();
        assert_eq!(w.digest, DigestKind::Sha256);
    }

    #[test]
    fn default_is_blake3() {
        assert_eq!(DigestKind::default(), DigestKind::Blake3);
    }
}
