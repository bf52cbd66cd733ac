//! Output writer.
//!
//! The result file is plain text: a `#url, #score` header followed by one
//! `<url>,  <score>` line per record, each followed by a blank line.

use crate::error::{CrawlerError, Result};
use crate::record::Record;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Header line of every result file
pub const HEADER: &str = "#url, #score\n";

/// Render ranked records into the result file format.
pub fn render(records: &[Record]) -> String {
    let mut out = String::from(HEADER);
    for record in records {
        out.push_str(&format!("{},  {}\n\n", record.source_url(), record.priority_score));
    }
    out
}

/// Write `contents` to `path`, replacing any existing file.
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over `path`, so readers never observe a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| CrawlerError::Io(e.error))?;
    Ok(())
}

/// Render and write the ranked records to `path`.
pub fn write_results(path: &Path, records: &[Record]) -> Result<()> {
    write_atomic(path, &render(records))?;
    info!(path = ?path, count = records.len(), "Wrote results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawMetadata;
    use tempfile::TempDir;

    fn scored(url: &str, score: u8) -> Record {
        let mut record = Record::new(RawMetadata {
            url: url.to_string(),
            ..Default::default()
        });
        record.priority_score = score;
        record
    }

    #[test]
    fn test_render_format() {
        let records = vec![scored("https://a.org/1", 2), scored("https://b.org/2", 0)];
        assert_eq!(
            render(&records),
            "#url, #score\nhttps://a.org/1,  2\n\nhttps://b.org/2,  0\n\n"
        );
    }

    #[test]
    fn test_render_empty_is_header_only() {
        assert_eq!(render(&[]), HEADER);
    }

    #[test]
    fn test_write_overwrites_and_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results.txt");
        std::fs::write(&path, "stale contents that are longer than the new file")?;

        let records = vec![scored("https://a.org/1", 4)];
        write_results(&path, &records)?;
        let first = std::fs::read(&path)?;
        write_results(&path, &records)?;
        let second = std::fs::read(&path)?;

        assert_eq!(first, second);
        assert_eq!(String::from_utf8_lossy(&first), "#url, #score\nhttps://a.org/1,  4\n\n");
        Ok(())
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let result = write_atomic(Path::new("/nonexistent/dir/results.txt"), "x");
        assert!(matches!(result, Err(CrawlerError::Io(_))));
    }
}
