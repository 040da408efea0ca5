//! Operation history records shared between the API and its stores

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UnknownVariant;

/// Source label recorded when the caller does not identify itself
pub const DEFAULT_SOURCE_TYPE: &str = "API";

/// UTC timestamp layout used in listings and exports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

mod display_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}

/// Kinds of PDF operations that get recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    MergePdf,
    ExtractPages,
    SplitPdf,
    RemovePage,
    ReorderPages,
    AddPassword,
    RemovePassword,
    PdfToImages,
    RotatePages,
    AddWatermark,
}

impl OperationType {
    pub const ALL: [OperationType; 10] = [
        OperationType::MergePdf,
        OperationType::ExtractPages,
        OperationType::SplitPdf,
        OperationType::RemovePage,
        OperationType::ReorderPages,
        OperationType::AddPassword,
        OperationType::RemovePassword,
        OperationType::PdfToImages,
        OperationType::RotatePages,
        OperationType::AddWatermark,
    ];

    /// Stored and exported name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::MergePdf => "MERGE_PDF",
            OperationType::ExtractPages => "EXTRACT_PAGES",
            OperationType::SplitPdf => "SPLIT_PDF",
            OperationType::RemovePage => "REMOVE_PAGE",
            OperationType::ReorderPages => "REORDER_PAGES",
            OperationType::AddPassword => "ADD_PASSWORD",
            OperationType::RemovePassword => "REMOVE_PASSWORD",
            OperationType::PdfToImages => "PDF_TO_IMAGES",
            OperationType::RotatePages => "ROTATE_PAGES",
            OperationType::AddWatermark => "ADD_WATERMARK",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Resolve the source label from an optional client-declared origin marker.
///
/// A missing or blank marker classifies the call as a plain API call.
pub fn classify_source(marker: Option<&str>) -> String {
    match marker.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_SOURCE_TYPE.to_string(),
    }
}

/// A history entry before the store assigns its id and timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub user_id: i64,
    pub operation_type: OperationType,
    pub source_type: String,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub user_agent: Option<String>,
    pub request_details: String,
}

impl NewHistoryEntry {
    pub fn new(user_id: i64, operation_type: OperationType, request_details: impl Into<String>) -> Self {
        Self {
            user_id,
            operation_type,
            source_type: DEFAULT_SOURCE_TYPE.to_string(),
            ip_address: None,
            country: None,
            state: None,
            user_agent: None,
            request_details: request_details.into(),
        }
    }
}

/// A persisted history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub operation_type: OperationType,
    #[serde(with = "display_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub source_type: String,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub user_agent: Option<String>,
    pub request_details: String,
}

impl HistoryEntry {
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// A history entry joined with its owner's display name and email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub user_name: String,
    pub user_email: String,
}

/// One page of a listing, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage<T> {
    pub content: Vec<T>,
    /// Zero-based page number
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> HistoryPage<T> {
    /// `size` must be positive; listings reject a zero size before querying.
    pub fn new(content: Vec<T>, number: u32, size: u32, total_elements: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(u64::from(size))
        };
        Self {
            content,
            number,
            size,
            total_elements,
            total_pages,
        }
    }
}
