pub mod audit;
pub mod types;

pub use audit::{
    classify_source, HistoryEntry, HistoryPage, HistoryRecord, NewHistoryEntry, OperationType,
    DEFAULT_SOURCE_TYPE, TIMESTAMP_FORMAT,
};
pub use types::{Role, UnknownVariant, User};
