//! Transcript files.
//!
//! A finished run is saved as `output_<unix-seconds>.txt`: the full
//! transcript, a newline, then a one-line summary of the token counts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{BudgetError, Result};

/// A finished run that can be written to disk.
pub trait Report {
    /// Prompt, reasoning and answer as one string.
    fn transcript(&self) -> &str;

    /// One-line diagnostic summary.
    fn summary(&self) -> String;
}

/// File name for a transcript written at `at`.
pub fn transcript_file_name(at: DateTime<Utc>) -> String {
    format!("output_{}.txt", at.timestamp())
}

/// Write `report` into `dir`, creating the directory if needed.
pub async fn write_report<R: Report + ?Sized>(dir: &Path, report: &R) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BudgetError::io(dir, e))?;

    let path = dir.join(transcript_file_name(Utc::now()));
    let contents = format!("{}\n{}", report.transcript(), report.summary());
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| BudgetError::io(&path, e))?;

    tracing::info!(path = %path.display(), "Wrote transcript");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Fixed;

    impl Report for Fixed {
        fn transcript(&self) -> &str {
            "prompt<think>\nx</think>\nanswer"
        }

        fn summary(&self) -> String {
            "tokens: 3".to_string()
        }
    }

    #[test]
    fn test_transcript_file_name() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(transcript_file_name(at), "output_1700000000.txt");
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("runs");

        let path = write_report(&nested, &Fixed).await.unwrap();
        assert!(path.starts_with(&nested));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("output_") && name.ends_with(".txt"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "prompt<think>\nx</think>\nanswer\ntokens: 3");
    }
}
