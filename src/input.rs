//! Document input from files or stdin.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;

/// Read from stdin if piped (not a terminal).
///
/// Returns an empty string if stdin is a terminal. When `trim` is true, leading and
/// trailing whitespace is removed.
pub fn read_stdin(trim: bool) -> String {
    if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        if io::stdin().read_to_string(&mut buffer).is_ok() {
            return if trim {
                buffer.trim().to_string()
            } else {
                buffer
            };
        }
    }
    String::new()
}

/// Read a document verbatim from `file`, or from piped stdin.
///
/// Unlike `read_stdin`, an interactive stdin is an error: saving an empty document
/// would soft-delete every todo of the date.
pub fn read_document(file: Option<&Path>) -> Result<String, String> {
    if let Some(path) = file {
        return fs::read_to_string(path).map_err(|e| format!("reading {}: {}", path.display(), e));
    }
    if io::stdin().is_terminal() {
        return Err("no input: pass --file or pipe markdown on stdin".to_string());
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("reading stdin: {}", e))?;
    Ok(buffer)
}

/// Write `content` to `path`.
pub fn write_document(path: &Path, content: &str) -> Result<(), String> {
    fs::write(path, content).map_err(|e| format!("writing {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_document_from_file_is_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("day.md");
        write_document(&path, "- [ ] one  \n\n").unwrap();

        assert_eq!(read_document(Some(&path)).unwrap(), "- [ ] one  \n\n");
    }

    #[test]
    fn test_read_document_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_document(Some(&dir.path().join("nope.md"))).unwrap_err();
        assert!(err.starts_with("reading "), "got: {}", err);
    }
}
