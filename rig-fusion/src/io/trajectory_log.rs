//! Trajectory log: one accepted 2D pose per line as `x y yaw`.
//!
//! Rows go to `<path>.partial` and only reach `path` once the run
//! succeeds, the same way the output stream is written.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::types::Pose2D;

/// Append-only writer for accepted robot poses.
#[derive(Debug)]
pub struct TrajectoryLog {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    partial_path: PathBuf,
    rows: usize,
}

impl TrajectoryLog {
    /// Start a log that will land at `path` on [`finish`](Self::finish).
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut partial: OsString = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial_path = PathBuf::from(partial);

        let writer = BufWriter::new(File::create(&partial_path)?);
        Ok(Self {
            writer: Some(writer),
            path,
            partial_path,
            rows: 0,
        })
    }

    pub fn append(&mut self, pose: &Pose2D) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(finished)?;
        writeln!(writer, "{:.6} {:.6} {:.6}", pose.x, pose.y, pose.theta)?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.as_mut().ok_or_else(finished)?.flush()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Final location of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and move the log into place.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        let writer = self.writer.take().ok_or_else(finished)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.partial_path, &self.path)?;
        Ok(self.path.clone())
    }
}

fn finished() -> io::Error {
    io::Error::other("trajectory log already finished")
}

impl Drop for TrajectoryLog {
    fn drop(&mut self) {
        if self.writer.take().is_some()
            && let Err(e) = fs::remove_file(&self.partial_path)
        {
            log::warn!(
                "Could not remove partial trajectory {}: {}",
                self.partial_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rows_are_space_separated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trajectory.txt");
        let mut log = TrajectoryLog::create(&path).unwrap();
        log.append(&Pose2D::new(1.0, -2.5, 0.25)).unwrap();
        log.append(&Pose2D::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(log.rows(), 2);
        assert!(!path.exists());
        assert_eq!(log.finish().unwrap(), path);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["1.000000 -2.500000 0.250000", "0.000000 0.000000 0.000000"]);
    }

    #[test]
    fn test_unfinished_log_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trajectory.txt");
        {
            let mut log = TrajectoryLog::create(&path).unwrap();
            log.append(&Pose2D::new(1.0, 0.0, 0.0)).unwrap();
            log.flush().unwrap();
        }
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
