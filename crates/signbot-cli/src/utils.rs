//! Shared utilities

use std::path::Path;

/// File types the assistant's retrieval index accepts from the shell
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "md"];

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Reject files whose extension is not in [`ALLOWED_EXTENSIONS`]
pub fn check_extension(path: &Path) -> Result<(), String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(format!(
            "{} is not a supported file type (expected one of: {})",
            path.display(),
            ALLOWED_EXTENSIONS.join(", ")
        )),
    }
}

/// Short name shown for an attached file
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_check_extension() {
        assert!(check_extension(Path::new("notes/Report.PDF")).is_ok());
        assert!(check_extension(Path::new("readme.md")).is_ok());
        assert!(check_extension(Path::new("photo.png")).is_err());
        assert!(check_extension(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_file_label() {
        assert_eq!(file_label(Path::new("/tmp/docs/guide.docx")), "guide.docx");
    }
}
