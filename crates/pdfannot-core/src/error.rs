use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotError {
    #[error("Failed to load PDF: {0}")]
    LoadFailure(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Failed to render page {page}: {reason}")]
    RenderFailure { page: u32, reason: String },

    #[error("Failed to add {edit}: {reason}")]
    MutationFailure { edit: &'static str, reason: String },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to update PDF view after edit: {0}. Edits might not be reflected until the document is saved.")]
    ResyncFailure(String),

    #[error("Failed to save PDF: {0}")]
    SaveFailure(String),

    #[error("No PDF loaded")]
    NoDocument,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Another edit is still being applied")]
    Busy,
}

/// Coarse classification used by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Load,
    Render,
    Mutation,
    Resync,
    Save,
    Usage,
    Busy,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Load => "load",
            ErrorKind::Render => "render",
            ErrorKind::Mutation => "mutation",
            ErrorKind::Resync => "resync",
            ErrorKind::Save => "save",
            ErrorKind::Usage => "usage",
            ErrorKind::Busy => "busy",
        }
    }
}

impl AnnotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnnotError::LoadFailure(_) | AnnotError::UnsupportedFile(_) => ErrorKind::Load,
            AnnotError::RenderFailure { .. } => ErrorKind::Render,
            AnnotError::MutationFailure { .. } | AnnotError::InvalidImage(_) => ErrorKind::Mutation,
            AnnotError::ResyncFailure(_) => ErrorKind::Resync,
            AnnotError::SaveFailure(_) => ErrorKind::Save,
            AnnotError::NoDocument | AnnotError::InvalidConfig(_) => ErrorKind::Usage,
            AnnotError::Busy => ErrorKind::Busy,
        }
    }

    pub(crate) fn mutation(edit: &'static str, reason: impl ToString) -> Self {
        AnnotError::MutationFailure {
            edit,
            reason: reason.to_string(),
        }
    }
}
