//! The append-only NDJSON mirror of committed events.
//!
//! One JSON object per line, appended in commit order, synced before the
//! append returns. The file is the secondary, human-recoverable
//! representation; the database stays authoritative and `repair_events`
//! rewrites the file from it when the two diverge.

use crate::error::Result;
use chronicle_kernel::EventRecord;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

pub struct LogContents {
    pub records: Vec<EventRecord>,
    pub malformed_lines: usize,
}

pub fn append_records(path: &Path, records: &[EventRecord]) -> std::io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for record in records {
        let line = record
            .to_line()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }
    file.sync_data()?;
    Ok(())
}

/// Reads the whole log. A missing file is an empty log; malformed lines are
/// counted rather than fatal so `validate` can report them.
pub fn read_records(path: &Path) -> Result<LogContents> {
    if !path.exists() {
        return Ok(LogContents { records: Vec::new(), malformed_lines: 0 });
    }
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut malformed_lines = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match EventRecord::from_line(&line) {
            Ok(record) => records.push(record),
            Err(_) => malformed_lines += 1,
        }
    }
    Ok(LogContents { records, malformed_lines })
}

/// Replaces the log wholesale. Callers back the old file up first.
pub fn rewrite(path: &Path, records: &[EventRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    for record in records {
        file.write_all(record.to_line()?.as_bytes())?;
        file.write_all(b"\n")?;
    }
    file.sync_data()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, turn_number: i64) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            campaign_id: "camp_a".into(),
            turn_id: turn_number,
            turn_number,
            command: "state set".into(),
            payload: serde_json::json!({}),
            timestamp: "2025-06-01T10:00:00+00:00".into(),
        }
    }

    #[test]
    fn append_then_read_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.ndjson");

        append_records(&path, &[record("evt_a", 1), record("evt_b", 1)]).unwrap();
        append_records(&path, &[record("evt_c", 2)]).unwrap();

        let contents = read_records(&path).unwrap();
        let ids: Vec<_> = contents.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["evt_a", "evt_b", "evt_c"]);
        assert_eq!(contents.malformed_lines, 0);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let contents = read_records(&dir.path().join("events.ndjson")).unwrap();
        assert!(contents.records.is_empty());
    }

    #[test]
    fn malformed_lines_are_counted_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        append_records(&path, &[record("evt_a", 1)]).unwrap();
        std::fs::write(
            &path,
            format!("{}\nnot json at all\n", std::fs::read_to_string(&path).unwrap().trim_end()),
        )
        .unwrap();

        let contents = read_records(&path).unwrap();
        assert_eq!(contents.records.len(), 1);
        assert_eq!(contents.malformed_lines, 1);
    }

    #[test]
    fn rewrite_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        append_records(&path, &[record("evt_a", 1), record("evt_b", 1)]).unwrap();

        rewrite(&path, &[record("evt_a", 1)]).unwrap();
        let contents = read_records(&path).unwrap();
        assert_eq!(contents.records.len(), 1);
        assert_eq!(contents.records[0].id, "evt_a");
    }
}
