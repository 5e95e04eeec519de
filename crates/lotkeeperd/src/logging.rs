//! Log file handling

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// File name of the JSON log under the configured log directory
pub const LOG_FILENAME: &str = "lotkeeperd.log";

/// Open the daemon's log file for appending, creating `log_dir` if needed
pub fn open_log_file(log_dir: &Path) -> io::Result<File> {
    std::fs::create_dir_all(log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("state").join("logs");

        writeln!(open_log_file(&log_dir).unwrap(), "first").unwrap();
        writeln!(open_log_file(&log_dir).unwrap(), "second").unwrap();

        let contents = std::fs::read_to_string(log_dir.join(LOG_FILENAME)).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }
}
