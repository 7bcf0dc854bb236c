use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn editor_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/editor.log")
}

/// Best-effort append; editing must never fail because a log line could not
/// be written.
pub fn append_editor_log_line(state_root: &Path, line: &str) {
    let path = editor_log_path(state_root);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let stamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let _ = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| writeln!(file, "{stamp} {line}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_timestamped_lines() {
        let temp = tempdir().expect("tempdir");
        append_editor_log_line(temp.path(), "first");
        append_editor_log_line(temp.path(), "second");
        let body = fs::read_to_string(editor_log_path(temp.path())).expect("read log");
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" first"));
        assert!(lines[1].ends_with(" second"));
    }
}
