//! Multipart form parsing for the PDF routes

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// All parts of a form keyed by field name
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn parse(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            ApiError::BadRequest(format!("Failed to read multipart field: {}", e.body_text()))
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            let bytes = field.bytes().await.map_err(|e| {
                ApiError::BadRequest(format!("Failed to read field '{}': {}", name, e.body_text()))
            })?;

            match file_name {
                Some(file_name) => {
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            content: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        ApiError::BadRequest(format!("Field '{}' must be UTF-8 text", name))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Take a required PDF part, checking its content type and size
    pub fn pdf(&mut self, name: &str) -> Result<UploadedFile, ApiError> {
        let file = self
            .files
            .remove(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing required file '{}'", name)))?;
        if !is_pdf_content_type(file.content_type.as_deref()) {
            return Err(ApiError::BadRequest("File must be PDF format".into()));
        }
        if file.content.is_empty() {
            return Err(ApiError::BadRequest("PDF file cannot be empty".into()));
        }
        Ok(file)
    }

    /// A non-blank text field, trimmed
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required_text(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing required field '{}'", name)))
    }

    /// Untrimmed value; passwords keep their whitespace
    pub fn raw_text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, ApiError> {
        self.text(name)
            .map(|v| {
                v.parse().map_err(|_| {
                    ApiError::BadRequest(format!("Field '{}' must be an integer", name))
                })
            })
            .transpose()
    }

    pub fn required_int(&self, name: &str) -> Result<i64, ApiError> {
        self.int(name)?
            .ok_or_else(|| ApiError::BadRequest(format!("Missing required field '{}'", name)))
    }

    /// Output file name from `name`, or `default` when blank
    pub fn output_name(&self, name: &str, default: &str) -> String {
        self.text(name).unwrap_or(default).to_string()
    }
}

/// Accepts `application/pdf` with optional parameters
pub fn is_pdf_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}
