//! CSV export of the operation history

use shared_types::HistoryRecord;

pub const HEADER: [&str; 11] = [
    "id",
    "user_id",
    "user_name",
    "user_email",
    "operation_type",
    "timestamp",
    "source_type",
    "ip_address",
    "country",
    "state",
    "request_details",
];

/// Quote a field when it contains a delimiter, quote or line break
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn to_csv(records: &[HistoryRecord]) -> String {
    let mut out = HEADER.join(",");
    out.push('\n');

    for record in records {
        let entry = &record.entry;
        let fields = [
            entry.id.to_string(),
            entry.user_id.to_string(),
            record.user_name.clone(),
            record.user_email.clone(),
            entry.operation_type.as_str().to_string(),
            entry.formatted_timestamp(),
            entry.source_type.clone(),
            entry.ip_address.clone().unwrap_or_default(),
            entry.country.clone().unwrap_or_default(),
            entry.state.clone().unwrap_or_default(),
            entry.request_details.clone(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use shared_types::{HistoryEntry, OperationType};

    fn record(details: &str) -> HistoryRecord {
        HistoryRecord {
            entry: HistoryEntry {
                id: 3,
                user_id: 1,
                operation_type: OperationType::ReorderPages,
                timestamp: Utc.with_ymd_and_hms(2024, 2, 29, 13, 5, 9).unwrap(),
                source_type: "WEB".into(),
                ip_address: Some("10.0.0.2".into()),
                country: Some("Local".into()),
                state: Some("Local".into()),
                user_agent: Some("curl/8".into()),
                request_details: details.into(),
            },
            user_name: "Ada Lovelace".into(),
            user_email: "ada@example.com".into(),
        }
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_export_layout() {
        let csv = to_csv(&[record("Reordered pages in a.pdf with order 3,1,2, output: r.pdf")]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,user_id,user_name,user_email,operation_type,timestamp,source_type,ip_address,country,state,request_details"
        );
        assert_eq!(
            lines.next().unwrap(),
            "3,1,Ada Lovelace,ada@example.com,REORDER_PAGES,2024-02-29 13:05:09,WEB,10.0.0.2,Local,Local,\"Reordered pages in a.pdf with order 3,1,2, output: r.pdf\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty_export_has_header_only() {
        assert_eq!(to_csv(&[]).lines().count(), 1);
    }
}
