//! Offline consolidation of per-period archives.
//!
//! Archives are merged as plain JSON values so files written by other
//! tools, or with extra fields, pass through untouched. The combined list is
//! sorted by each record's `date`, oldest first, with undated records last.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use crate::archive::{write_json_atomic, ArchiveError};

/// A four-digit 19xx/20xx year not embedded in a longer number.
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    /// File does not exist.
    Skipped,
    /// File exists but could not be read or parsed.
    Failed(String),
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStat {
    pub path: PathBuf,
    pub year: String,
    pub count: usize,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub records: Vec<Value>,
    pub files: Vec<FileStat>,
}

impl MergeReport {
    /// Sum of the per-file counts.
    pub fn counted(&self) -> usize {
        self.files.iter().map(|f| f.count).sum()
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }
}

/// Read every archive in order, combine and sort.
pub fn merge_archives(paths: &[PathBuf]) -> MergeReport {
    let mut report = MergeReport::default();

    for path in paths {
        let year = infer_year(path);
        let (count, status) = match read_into(path, &mut report.records) {
            Ok(count) => {
                info!("{} ({}): {} records", path.display(), year, count);
                (count, FileStatus::Ok)
            }
            Err(ReadFailure::Missing) => {
                warn!("{} not found, skipping", path.display());
                (0, FileStatus::Skipped)
            }
            Err(ReadFailure::Invalid(reason)) => {
                warn!("Failed to read {}: {}", path.display(), reason);
                (0, FileStatus::Failed(reason))
            }
        };
        report.files.push(FileStat {
            path: path.clone(),
            year,
            count,
            status,
        });
    }

    sort_by_date(&mut report.records);
    report
}

enum ReadFailure {
    Missing,
    Invalid(String),
}

fn read_into(path: &Path, out: &mut Vec<Value>) -> Result<usize, ReadFailure> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ReadFailure::Missing),
        Err(e) => return Err(ReadFailure::Invalid(e.to_string())),
    };
    let value: Value =
        serde_json::from_str(&contents).map_err(|e| ReadFailure::Invalid(e.to_string()))?;

    Ok(match value {
        Value::Array(items) => {
            let count = items.len();
            out.extend(items);
            count
        }
        // A bare object is merged as one record but reported by key count,
        // so a mismatch with the merged total flags the odd file
        Value::Object(map) => {
            let count = map.len();
            out.push(Value::Object(map));
            count
        }
        _ => 0,
    })
}

/// Write the merged records atomically.
pub fn write_merged(path: &Path, records: &[Value]) -> Result<(), ArchiveError> {
    write_json_atomic(path, records).map_err(|source| ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Year named in the file name, or `unknown`.
pub fn infer_year(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    YEAR_PATTERN
        .captures(&name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Stable ascending sort on `date`; records without a usable date go last.
pub fn sort_by_date(records: &mut [Value]) {
    records.sort_by(|a, b| match (record_date(a), record_date(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Parse a record's `date` as an RFC 3339 timestamp, a naive timestamp or
/// a `YYYY-MM-DD` day (midnight UTC).
pub fn record_date(record: &Value) -> Option<DateTime<Utc>> {
    let raw = record.get("date")?.as_str()?.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_infer_year() {
        assert_eq!(infer_year(Path::new("tweets_bbri_2020.json")), "2020");
        assert_eq!(infer_year(Path::new("data/1999-archive.json")), "1999");
        assert_eq!(infer_year(Path::new("/tmp/2021/tweets.json")), "unknown");
        assert_eq!(infer_year(Path::new("tweets_120245.json")), "unknown");
        assert_eq!(infer_year(Path::new("tweets.json")), "unknown");
    }

    #[test]
    fn test_sort_puts_undated_last_and_is_stable() {
        let mut records = vec![
            json!({"date": "2024-03-01", "tweet": "c"}),
            json!({"tweet": "no date"}),
            json!({"date": "2019-01-05", "tweet": "a"}),
            json!({"date": "garbage", "tweet": "bad date"}),
            json!({"date": "2024-03-01T00:00:00.000Z", "tweet": "c2"}),
            json!({"date": "2020-06-30T23:00:00+07:00", "tweet": "b"}),
        ];

        sort_by_date(&mut records);

        let order: Vec<_> = records.iter().map(|r| r["tweet"].as_str().unwrap()).collect();
        assert_eq!(order, vec!["a", "b", "c", "c2", "no date", "bad date"]);
    }

    #[test]
    fn test_read_shapes() {
        let dir = tempdir().unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            path
        };
        let paths = vec![
            write("array_2019.json", r#"[{"date":"2019-02-01"},{"date":"2019-01-01"}]"#),
            write("object_2020.json", r#"{"date":"2020-01-01","tweet":"x","sentiment":""}"#),
            write("scalar_2021.json", "42"),
            write("broken_2022.json", "[{"),
            dir.path().join("missing_2023.json"),
        ];

        let report = merge_archives(&paths);

        let counts: Vec<_> = report.files.iter().map(|f| f.count).collect();
        assert_eq!(counts, vec![2, 3, 0, 0, 0]);
        assert_eq!(report.files[2].status, FileStatus::Ok);
        assert!(matches!(report.files[3].status, FileStatus::Failed(_)));
        assert_eq!(report.files[4].status, FileStatus::Skipped);
        assert_eq!(report.files[4].year, "2023");
        assert_eq!(report.total(), 3);
        assert_eq!(report.counted(), 5);
        assert_eq!(report.records[0]["date"], "2019-01-01");
    }
}
