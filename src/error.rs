//! Error type shared by every handler

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML document")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to convert object")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("object is {found}, expected {expected}")]
    KindMismatch { expected: String, found: String },

    #[error("object has no metadata.name")]
    MissingName,

    #[error("object has no apiVersion/kind, call with_gvk first")]
    MissingGvk,

    #[error("failed to discover resource {api_version}/{kind}")]
    Discovery {
        api_version: String,
        kind: String,
        #[source]
        source: kube::Error,
    },

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("failed to build client")]
    Config(#[source] anyhow::Error),
}

impl Error {
    /// API status code carried by the error, if it came from the API server
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Kube(kube::Error::Api(resp)) => Some(resp.code),
            Error::Discovery {
                source: kube::Error::Api(resp),
                ..
            } => Some(resp.code),
            _ => None,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.status_code() == Some(409)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_file_message_includes_path() {
        let err = Error::ReadFile {
            path: PathBuf::from("/tmp/deploy.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "failed to read /tmp/deploy.yaml");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_local_errors_have_no_status() {
        assert_eq!(Error::MissingName.status_code(), None);
        assert!(!Error::MissingGvk.is_already_exists());
        assert!(!Error::InvalidPatch("x".into()).is_not_found());
    }
}
