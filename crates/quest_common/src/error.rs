//! Error types for KubeQuest.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuestError {
    #[error("Content error: {0}")]
    Content(String),

    #[error("Progress store error: {0}")]
    Store(String),

    #[error("World '{0}' not found in the content catalog")]
    WorldNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
