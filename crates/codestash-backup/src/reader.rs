//! Size-bounded file reading.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Appended to content cut at the size ceiling.
pub const TRUNCATION_MARKER: &str = "\n\n# [TRUNCATED DUE TO SIZE]\n";

/// Text read from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileText {
    pub text: String,
    pub truncated: bool,

    /// Size of the file on disk, not of `text`
    pub size_bytes: u64,

    /// `text` is a placeholder describing a read failure
    pub unreadable: bool,
}

impl FileText {
    /// Number of lines in the decoded text.
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Read at most `max_kb * 1024` bytes of `path`, decoding lossily as UTF-8.
///
/// Never fails: an I/O error yields a placeholder naming the path and the
/// error, and `warn` receives a one-line description.
pub fn read_with_limit(path: &Path, max_kb: u64, warn: impl FnOnce(&str)) -> FileText {
    match read_bytes_with_limit(path, max_kb.saturating_mul(1024)) {
        Ok((bytes, size_bytes)) => {
            let max_bytes = max_kb.saturating_mul(1024) as usize;
            let truncated = bytes.len() > max_bytes;
            let kept = if truncated { &bytes[..max_bytes] } else { &bytes[..] };

            let mut text = String::from_utf8_lossy(kept).into_owned();
            if truncated {
                text.push_str(TRUNCATION_MARKER);
            }
            FileText {
                text,
                truncated,
                size_bytes,
                unreadable: false,
            }
        }
        Err(e) => {
            warn(&format!("Could not read {}: {}", path.display(), e));
            FileText {
                text: format!("# [UNREADABLE FILE: {} | {}]", path.display(), e),
                truncated: false,
                size_bytes: 0,
                unreadable: true,
            }
        }
    }
}

/// Reads one byte past the limit so truncation can be detected without
/// loading the whole file.
fn read_bytes_with_limit(path: &Path, max_bytes: u64) -> io::Result<(Vec<u8>, u64)> {
    let file = File::open(path)?;
    let size_bytes = file.metadata()?.len();
    let mut bytes = Vec::with_capacity(size_bytes.min(max_bytes.saturating_add(1)) as usize);
    file.take(max_bytes.saturating_add(1)).read_to_end(&mut bytes)?;
    Ok((bytes, size_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_small_file_read_whole() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.ts");
        fs::write(&path, "export const a = 1;\n").unwrap();

        let read = read_with_limit(&path, 1, |_| panic!("no warning expected"));
        assert_eq!(read.text, "export const a = 1;\n");
        assert!(!read.truncated);
        assert_eq!(read.size_bytes, 20);
        assert_eq!(read.line_count(), 1);
    }

    #[test]
    fn test_large_file_truncated_with_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "a".repeat(3000)).unwrap();

        let read = read_with_limit(&path, 1, |_| {});
        assert!(read.truncated);
        assert!(read.text.ends_with(TRUNCATION_MARKER));
        assert_eq!(read.text.len(), 1024 + TRUNCATION_MARKER.len());
        assert_eq!(read.size_bytes, 3000);
    }

    #[test]
    fn test_exact_limit_is_not_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exact.txt");
        fs::write(&path, "b".repeat(1024)).unwrap();

        let read = read_with_limit(&path, 1, |_| {});
        assert!(!read.truncated);
        assert_eq!(read.text.len(), 1024);
    }

    #[test]
    fn test_read_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.ts");
        fs::write(&path, "line\n".repeat(500)).unwrap();

        let first = read_with_limit(&path, 1, |_| {});
        let second = read_with_limit(&path, 1, |_| {});
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, [b'o', b'k', 0xff, 0xfe]).unwrap();

        let read = read_with_limit(&path, 4, |_| {});
        assert!(read.text.starts_with("ok"));
        assert!(read.text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_missing_file_yields_placeholder_and_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.ts");
        let warnings = RefCell::new(Vec::new());

        let read = read_with_limit(&path, 4, |msg| warnings.borrow_mut().push(msg.to_string()));
        assert!(read.unreadable);
        assert!(read.text.starts_with("# [UNREADABLE FILE: "));
        assert!(read.text.contains("gone.ts"));
        assert_eq!(warnings.borrow().len(), 1);
    }
}
