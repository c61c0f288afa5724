//! Size-capped log file.
//!
//! When a write would push the active file past `max_bytes`, the file is
//! shifted to `<file>.1`, older backups move up by one, and anything past
//! `<file>.<max_backups>` is deleted. Rotation happens between writes, and
//! the non-blocking worker issues one write per event, so an event is never
//! split across files.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only file that rotates by size.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    max_backups: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    /// Open (or create) `path`, creating parent directories as needed.
    ///
    /// `max_bytes == 0` disables rotation. `max_backups == 0` truncates the
    /// file in place instead of keeping backups.
    pub fn open(path: &Path, max_bytes: u64, max_backups: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = open_append(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            max_bytes,
            max_backups,
            file,
            written,
        })
    }

    /// Path of backup `n`, e.g. `nebula.log.3`.
    pub fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn should_rotate(&self, incoming: usize) -> bool {
        self.max_bytes > 0
            && self.written > 0
            && self.written.saturating_add(incoming as u64) > self.max_bytes
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_backups == 0 {
            self.file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_backups).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                std::fs::rename(&from, self.backup_path(n + 1))?;
            }
        }
        std::fs::rename(&self.path, self.backup_path(1))?;

        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rotate(buf.len()) {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(i: usize) -> Vec<u8> {
        format!("{i:02}{}\n", "x".repeat(57)).into_bytes()
    }

    #[test]
    fn no_rotation_under_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nebula.log");
        let mut file = RotatingFile::open(&path, 1024, 5).unwrap();
        file.write_all(&chunk(0)).unwrap();
        file.write_all(&chunk(1)).unwrap();
        file.flush().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 120);
        assert!(!file.backup_path(1).exists());
    }

    #[test]
    fn keeps_at_most_max_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nebula.log");
        let mut file = RotatingFile::open(&path, 100, 5).unwrap();

        // Each 60-byte chunk after the first overflows the 100-byte cap,
        // so ten writes rotate nine times.
        for i in 0..10 {
            file.write_all(&chunk(i)).unwrap();
        }
        file.flush().unwrap();

        for n in 1..=5 {
            assert!(file.backup_path(n).exists(), "backup {n} missing");
        }
        assert!(!file.backup_path(6).exists());

        assert_eq!(std::fs::read(&path).unwrap(), chunk(9));
        assert_eq!(std::fs::read(file.backup_path(1)).unwrap(), chunk(8));
        assert_eq!(std::fs::read(file.backup_path(5)).unwrap(), chunk(4));
    }

    #[test]
    fn existing_size_counts_toward_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nebula.log");
        std::fs::write(&path, chunk(0)).unwrap();

        let mut file = RotatingFile::open(&path, 100, 2).unwrap();
        file.write_all(&chunk(1)).unwrap();
        file.flush().unwrap();

        assert_eq!(std::fs::read(file.backup_path(1)).unwrap(), chunk(0));
        assert_eq!(std::fs::read(&path).unwrap(), chunk(1));
    }

    #[test]
    fn zero_backups_truncates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nebula.log");
        let mut file = RotatingFile::open(&path, 100, 0).unwrap();
        for i in 0..3 {
            file.write_all(&chunk(i)).unwrap();
        }
        file.flush().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), chunk(2));
        assert!(!file.backup_path(1).exists());
    }

    #[test]
    fn zero_max_bytes_never_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nebula.log");
        let mut file = RotatingFile::open(&path, 0, 5).unwrap();
        for i in 0..5 {
            file.write_all(&chunk(i)).unwrap();
        }
        file.flush().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 300);
        assert!(!file.backup_path(1).exists());
    }
}
