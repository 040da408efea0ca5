use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfEditError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    /// A page index or range outside the document; the message names the page count
    #[error("{0}")]
    InvalidRange(String),

    /// A parameter rejected before any page is touched
    #[error("{0}")]
    InvalidInput(String),

    #[error("Document is not password protected")]
    NotEncrypted,

    #[error("Document is already password protected")]
    AlreadyEncrypted,

    /// Page edits need a decrypted document; remove the password first
    #[error("Document is password protected")]
    Encrypted,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Failed to render PDF: {0}")]
    RenderError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

impl PdfEditError {
    /// Failures the caller can correct by resubmitting different input.
    ///
    /// Everything else found after parsing is treated as a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PdfEditError::InvalidPassword)
    }
}

impl From<lopdf::Error> for PdfEditError {
    fn from(err: lopdf::Error) -> Self {
        PdfEditError::OperationError(err.to_string())
    }
}
