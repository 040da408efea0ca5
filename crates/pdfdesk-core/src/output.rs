use serde::Serialize;

/// A single serialized document produced by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfOutput {
    pub file_name: String,
    pub message: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl PdfOutput {
    pub fn new(file_name: impl Into<String>, message: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            message: message.into(),
            content,
        }
    }
}

/// The two halves of a split; the second may hold zero pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    pub first: PdfOutput,
    pub second: PdfOutput,
}

impl SplitOutput {
    pub fn into_parts(self) -> [PdfOutput; 2] {
        [self.first, self.second]
    }
}

/// One rasterized page, named `<base>_page_<n>.png`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Strip a trailing `.pdf` (any case) from a file name.
pub fn base_name(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4 && file_name.is_char_boundary(len - 4) && file_name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &file_name[..len - 4]
    } else {
        file_name
    }
}
