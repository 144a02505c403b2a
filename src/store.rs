use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::{
    fs,
    path::PathBuf,
};
use tracing::{debug, info, warn};

use crate::models::{PostRow, Snapshot};

/// Read side of the data store: yields the newest snapshot, if any.
pub trait SnapshotSource {
    fn latest(&self) -> Result<Option<Snapshot>>;
}

/// Write side of the data store: persists one ingestion run.
pub trait SnapshotSink {
    fn save(&self, rows: &[PostRow], at: DateTime<Utc>) -> Result<PathBuf>;
}

/// A directory of CSV files, one per ingestion run.
#[derive(Debug, Clone)]
pub struct CsvFolder {
    dir: PathBuf,
}

impl CsvFolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn newest_csv(&self) -> Result<Option<(PathBuf, DateTime<Utc>)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Snapshot folder missing - dir={}", self.dir.display());
                return Ok(None);
            }
            Err(e) => return Err(e).with_context(|| format!("listing {}", self.dir.display())),
        };

        let mut best: Option<(PathBuf, DateTime<Utc>)> = None;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if !is_csv || !path.is_file() {
                continue;
            }
            let modified: DateTime<Utc> = entry
                .metadata()
                .and_then(|m| m.modified())
                .with_context(|| format!("reading mtime of {}", path.display()))?
                .into();
            if best.as_ref().map_or(true, |(_, m)| modified > *m) {
                best = Some((path, modified));
            }
        }
        Ok(best)
    }
}

impl SnapshotSource for CsvFolder {
    fn latest(&self) -> Result<Option<Snapshot>> {
        let Some((path, modified)) = self.newest_csv()? else {
            info!("No CSV snapshots found - dir={}", self.dir.display());
            return Ok(None);
        };
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let snapshot = Snapshot::from_csv_bytes(&name, &bytes, Some(modified))?;
        info!(
            "Snapshot loaded - file={}, rows={}, columns={:?}",
            name,
            snapshot.rows.len(),
            snapshot.headers
        );
        Ok(Some(snapshot))
    }
}

impl SnapshotSink for CsvFolder {
    fn save(&self, rows: &[PostRow], at: DateTime<Utc>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| format!("create {:?}", self.dir))?;
        let file_name = format!("sentimiento_{}.csv", at.format("%Y-%m-%d_%H-%M-%S"));
        let path = self.dir.join(file_name);

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for r in rows {
            writer.serialize(r)?;
        }
        // header-only file when there are no rows, so readers still see the columns
        if rows.is_empty() {
            writer.write_record(["timestamp", "text", "likes", "sentiment_label"])?;
        }
        writer.flush()?;

        debug!("Snapshot written - path={}, rows={}", path.display(), rows.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_rows() -> Vec<PostRow> {
        vec![
            PostRow {
                timestamp: Some("2025-01-01T10:00:00+0000".into()),
                text: Some("Gran servicio, gracias".into()),
                likes: Some(4),
                sentiment_label: Some("positive".into()),
            },
            PostRow {
                timestamp: Some("N/A".into()),
                text: Some("N/A".into()),
                likes: Some(0),
                sentiment_label: Some("N/A".into()),
            },
        ]
    }

    #[test]
    fn saved_snapshot_reads_back_as_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvFolder::new(dir.path().join("datos"));
        let at = Utc.with_ymd_and_hms(2025, 9, 30, 22, 0, 3).unwrap();

        let path = store.save(&sample_rows(), at).unwrap();
        assert_eq!(path.file_name().unwrap(), "sentimiento_2025-09-30_22-00-03.csv");

        let snap = store.latest().unwrap().expect("snapshot");
        assert_eq!(snap.name, "sentimiento_2025-09-30_22-00-03.csv");
        assert_eq!(snap.headers, vec!["timestamp", "text", "likes", "sentiment_label"]);
        assert_eq!(snap.rows, sample_rows());
    }

    #[test]
    fn latest_picks_newest_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("b_old.csv");
        let new = dir.path().join("a_new.csv");
        fs::write(&old, "text\nviejo mensaje\n").unwrap();
        fs::write(&new, "text\nnuevo mensaje\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        fs::File::options().write(true).open(&old).unwrap().set_modified(past).unwrap();

        let snap = CsvFolder::new(dir.path()).latest().unwrap().unwrap();
        assert_eq!(snap.name, "a_new.csv");
        assert_eq!(snap.rows[0].text.as_deref(), Some("nuevo mensaje"));
    }

    #[test]
    fn missing_or_empty_folder_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvFolder::new(dir.path()).latest().unwrap().is_none());
        assert!(CsvFolder::new(dir.path().join("nope")).latest().unwrap().is_none());
    }
}
