//! Static 2D reference map.
//!
//! Plain text, one point per line:
//!
//! ```text
//! # x y (meters)
//! 0.000 1.250
//! 0.050,1.250
//! ```
//!
//! Coordinates may be separated by whitespace or a comma. Blank lines and
//! lines starting with `#` are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::PointCloud2D;

/// Reference map loading errors
#[derive(Error, Debug)]
pub enum ReferenceMapError {
    #[error("Cannot read reference map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed reference map line {line}: {content:?}")]
    Parse { line: usize, content: String },

    #[error("Reference map {path} contains no points")]
    Empty { path: PathBuf },
}

/// Load a reference map file into a point cloud.
pub fn load_reference_map(path: impl AsRef<Path>) -> Result<PointCloud2D, ReferenceMapError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ReferenceMapError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let map = parse_reference_map(&contents)?;
    if map.is_empty() {
        return Err(ReferenceMapError::Empty {
            path: path.to_path_buf(),
        });
    }
    log::info!("Loaded reference map {} ({} points)", path.display(), map.len());
    Ok(map)
}

/// Parse reference map text. An empty result is not an error here.
pub fn parse_reference_map(contents: &str) -> Result<PointCloud2D, ReferenceMapError> {
    let mut map = PointCloud2D::new();

    for (number, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = || ReferenceMapError::Parse {
            line: number + 1,
            content: raw.to_string(),
        };

        let mut fields = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty());
        let x: f32 = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(malformed)?;
        let y: f32 = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(malformed)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(malformed());
        }
        map.push_xy(x, y);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_mixed_separators() {
        let text = "# header\n\n0.0 1.0\n2.5,\t-3.0\n  4 5  \n";
        let map = parse_reference_map(text).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.point_at(1).x, 2.5);
        assert_eq!(map.point_at(1).y, -3.0);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_reference_map("1 2\n3\n").unwrap_err();
        assert!(matches!(err, ReferenceMapError::Parse { line: 2, .. }));

        let err = parse_reference_map("1 abc\n").unwrap_err();
        assert!(matches!(err, ReferenceMapError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_load_missing_and_empty() {
        assert!(matches!(
            load_reference_map("/nonexistent/map.txt"),
            Err(ReferenceMapError::Io { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# only comments").unwrap();
        assert!(matches!(
            load_reference_map(file.path()),
            Err(ReferenceMapError::Empty { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0 0\n1 0\n1 1").unwrap();
        let map = load_reference_map(file.path()).unwrap();
        assert_eq!(map.len(), 3);
    }
}
