use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document does not start with a PDF header")]
    NotPdf,
    #[error("failed to extract text from PDF: {0}")]
    Pdf(#[from] pdf_extract::OutputError),
}

/// Terminal failures of a single grade check. A report with no
/// recognizable grades is not an error.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("no document supplied")]
    MissingInput,
    #[error("document payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("could not read document: {0}")]
    Decode(#[from] ExtractError),
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
    #[error("free usage limit of {limit} checks reached")]
    UsageLimitReached { limit: i64 },
    #[error("unexpected processing failure: {0}")]
    Internal(String),
}

impl CheckError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True when the caller sent something unusable, as opposed to the
    /// service failing on its own.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput
                | Self::Encoding(_)
                | Self::Decode(_)
                | Self::TooLarge { .. }
                | Self::UsageLimitReached { .. }
        )
    }
}
