use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, FixedOffset};

/// Parse an item's RFC 3339 creation time, keeping the offset it was
/// reported in so the folder matches the date the API shows.
pub fn parse_capture_time(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
}

/// `root/YYYY/MM` for the given capture time.
pub fn month_dir(root: &Path, captured: &DateTime<FixedOffset>) -> PathBuf {
    root.join(format!("{:04}", captured.year()))
        .join(format!("{:02}", captured.month()))
}

/// Clean a filename by removing characters that are invalid on common
/// filesystems: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

/// False for names that would not land inside the directory they are
/// joined to: empty, `.` and `..`.
pub fn is_usable_filename(filename: &str) -> bool {
    !matches!(filename, "" | "." | "..")
}

/// Add a string suffix before the file extension.
///
/// For example, `"photo.jpg"` with suffix `"abc"` becomes `"photo-abc.jpg"`.
pub fn insert_suffix(filename: &str, suffix: &str) -> String {
    match filename.rfind('.') {
        Some(dot_pos) => {
            let (stem, ext) = filename.split_at(dot_pos);
            let mut result = String::with_capacity(stem.len() + 1 + suffix.len() + ext.len());
            result.push_str(stem);
            result.push('-');
            result.push_str(suffix);
            result.push_str(ext);
            result
        }
        None => format!("{}-{}", filename, suffix),
    }
}
