//! Write-once on-disk copy of fetched chart payloads.
//!
//! Layout: `<data_dir>/<market>/<code>/<YYYYMMDD>_raw.txt`. A file, once
//! written, is never replaced.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use time::Date;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileCache {
    data_dir: PathBuf,
}

impl RawFileCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, market: &str, code: &str, date: Date) -> PathBuf {
        let file_name = format!(
            "{:04}{:02}{:02}_raw.txt",
            date.year(),
            u8::from(date.month()),
            date.day()
        );
        self.data_dir.join(market).join(code).join(file_name)
    }

    /// Write `body` unless a file for the day already exists.
    ///
    /// Returns `Ok(true)` when this call created the file.
    pub fn store(
        &self,
        market: &str,
        code: &str,
        date: Date,
        body: &[u8],
    ) -> std::io::Result<bool> {
        let path = self.path_for(market, code, date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(error) => return Err(error),
        };
        file.write_all(body)?;
        file.sync_all()?;
        Ok(true)
    }

    /// Cached bytes for the day, or `None` when nothing was stored.
    pub fn load(&self, market: &str, code: &str, date: Date) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(market, code, date)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use time::macros::date;

    #[test]
    fn path_uses_compact_day_stamp() {
        let cache = RawFileCache::new("/var/stockrec");
        assert_eq!(
            cache.path_for("america", "AAPL", date!(2024 - 03 - 08)),
            PathBuf::from("/var/stockrec/america/AAPL/20240308_raw.txt")
        );
    }

    #[test]
    fn existing_file_is_never_overwritten() {
        let temp = tempdir().expect("tempdir");
        let cache = RawFileCache::new(temp.path());
        let day = date!(2024 - 03 - 08);

        assert!(cache.store("america", "AAPL", day, b"first").expect("store"));
        assert!(!cache.store("america", "AAPL", day, b"second").expect("store"));

        assert_eq!(
            cache.load("america", "AAPL", day).expect("load"),
            Some(b"first".to_vec())
        );
    }

    #[test]
    fn missing_day_loads_as_none() {
        let temp = tempdir().expect("tempdir");
        let cache = RawFileCache::new(temp.path());

        assert_eq!(
            cache.load("america", "MSFT", date!(2024 - 03 - 08)).expect("load"),
            None
        );
    }
}
