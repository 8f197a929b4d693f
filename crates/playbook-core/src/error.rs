use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybookError {
    #[error("not initialized: run 'playbook init'")]
    NotInitialized,

    #[error("playbook not found: {0}")]
    TemplateNotFound(String),

    #[error("playbook already exists: {0}")]
    TemplateExists(String),

    #[error("playbook '{playbook}' has no step '{step}'")]
    UnknownStep { playbook: String, step: String },

    #[error("step '{step}' is blocked: complete required step '{missing}' first")]
    StepBlocked { step: String, missing: String },

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid user id '{0}': must be alphanumeric with '-', '_' or '.'")]
    InvalidUserId(String),

    #[error("playbook '{playbook}' has duplicate order_index {order_index}")]
    DuplicateOrderIndex { playbook: String, order_index: u32 },

    #[error("playbook '{playbook}' has duplicate step id '{step}'")]
    DuplicateStepId { playbook: String, step: String },

    #[error("playbook '{0}' has no steps")]
    EmptyTemplate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PlaybookError {
    /// True for storage-layer failures a caller may retry. Everything else
    /// is a client-input or data-integrity error and retrying won't help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlaybookError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, PlaybookError>;
