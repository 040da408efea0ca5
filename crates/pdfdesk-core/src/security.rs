//! Password protection
//!
//! Protection uses AES-256 (standard security handler revision 6) with the
//! same password as owner and user password.

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::encryption::crypt_filters::{Aes256CryptFilter, CryptFilter};
use lopdf::encryption::DecryptionError;
use lopdf::{EncryptionState, EncryptionVersion, Permissions};
use rand::RngCore;

use crate::builder::copy_document;
use crate::error::PdfEditError;
use crate::output::PdfOutput;

const CRYPT_FILTER_NAME: &[u8] = b"StdCF";

/// Encrypt a document with `password`
pub fn add_password(
    bytes: &[u8],
    password: &str,
    output_name: &str,
) -> Result<PdfOutput, PdfEditError> {
    if password.is_empty() {
        return Err(PdfEditError::InvalidInput("Password cannot be empty".into()));
    }

    let source = crate::load_any(bytes)?;
    if source.is_encrypted() {
        return Err(PdfEditError::AlreadyEncrypted);
    }

    let mut doc = copy_document(&source)?;

    let mut file_key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut file_key);

    let filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
    let version = EncryptionVersion::V5 {
        encrypt_metadata: true,
        crypt_filters: BTreeMap::from([(CRYPT_FILTER_NAME.to_vec(), filter)]),
        file_encryption_key: &file_key,
        stream_filter: CRYPT_FILTER_NAME.to_vec(),
        string_filter: CRYPT_FILTER_NAME.to_vec(),
        owner_password: password,
        user_password: password,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version).map_err(|e| {
        PdfEditError::OperationError(format!("Failed to add password to PDF: {}", e))
    })?;
    doc.encrypt(&state).map_err(|e| {
        PdfEditError::OperationError(format!("Failed to add password to PDF: {}", e))
    })?;

    let content = crate::save(doc)?;
    Ok(PdfOutput::new(output_name, "Password added successfully", content))
}

/// Decrypt a protected document and write it back without encryption
pub fn remove_password(
    bytes: &[u8],
    password: &str,
    output_name: &str,
) -> Result<PdfOutput, PdfEditError> {
    let mut source = crate::load_any(bytes)?;
    if !source.is_encrypted() {
        return Err(PdfEditError::NotEncrypted);
    }

    source.decrypt(password).map_err(decryption_error)?;

    // A fresh document carries no Encrypt dictionary or encryption state.
    let doc = copy_document(&source)?;
    let content = crate::save(doc)?;
    Ok(PdfOutput::new(
        output_name,
        "Password removed successfully",
        content,
    ))
}

/// Only a failed password check is the caller's fault
fn decryption_error(err: lopdf::Error) -> PdfEditError {
    match err {
        lopdf::Error::Decryption(
            DecryptionError::IncorrectPassword | DecryptionError::StringPrep(_),
        ) => {
            tracing::debug!(error = %err, "PDF password rejected");
            PdfEditError::InvalidPassword
        }
        other => PdfEditError::OperationError(format!("Failed to decrypt PDF: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_pdf, page_texts};
    use lopdf::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_password_encrypts() {
        let pdf = create_test_pdf(3, "Sec");
        let out = add_password(&pdf, "s3cret", "protected.pdf").unwrap();
        assert_eq!(out.file_name, "protected.pdf");

        let doc = Document::load_mem(&out.content).unwrap();
        assert!(doc.is_encrypted());
        assert!(doc.trailer.get(b"Encrypt").is_ok());
    }

    #[test]
    fn test_password_round_trip() {
        let pdf = create_test_pdf(3, "Sec");
        let protected = add_password(&pdf, "s3cret", "protected.pdf").unwrap();
        let opened = remove_password(&protected.content, "s3cret", "unprotected.pdf").unwrap();

        let doc = Document::load_mem(&opened.content).unwrap();
        assert!(!doc.is_encrypted());
        assert_eq!(doc.get_pages().len(), 3);
        assert_eq!(page_texts(&opened.content), page_texts(&pdf));
    }

    #[test]
    fn test_wrong_password_is_client_error() {
        let pdf = create_test_pdf(1, "Sec");
        let protected = add_password(&pdf, "right", "protected.pdf").unwrap();
        let err = remove_password(&protected.content, "wrong", "x.pdf").unwrap_err();
        assert!(matches!(err, PdfEditError::InvalidPassword));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_remove_password_from_plain_document() {
        let pdf = create_test_pdf(1, "Plain");
        let err = remove_password(&pdf, "anything", "x.pdf").unwrap_err();
        assert!(matches!(err, PdfEditError::NotEncrypted));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_add_password_twice_fails() {
        let pdf = create_test_pdf(1, "Sec");
        let protected = add_password(&pdf, "pw", "p.pdf").unwrap();
        let err = add_password(&protected.content, "pw", "p.pdf").unwrap_err();
        assert!(matches!(err, PdfEditError::AlreadyEncrypted));
    }

    #[test]
    fn test_empty_password_rejected() {
        let pdf = create_test_pdf(1, "Sec");
        assert!(matches!(
            add_password(&pdf, "", "p.pdf"),
            Err(PdfEditError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_decryption_errors_other_than_password_are_server_errors() {
        let unsupported = decryption_error(lopdf::Error::Decryption(
            DecryptionError::UnsupportedRevision,
        ));
        assert!(matches!(unsupported, PdfEditError::OperationError(_)));
        assert!(!unsupported.is_client_error());

        let corrupt = decryption_error(lopdf::Error::Decryption(
            DecryptionError::MissingOwnerPassword,
        ));
        assert!(matches!(corrupt, PdfEditError::OperationError(_)));

        let rejected = decryption_error(lopdf::Error::Decryption(
            DecryptionError::IncorrectPassword,
        ));
        assert!(matches!(rejected, PdfEditError::InvalidPassword));
    }
}
