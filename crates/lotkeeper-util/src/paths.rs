//! Default paths for lotkeeper components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/lotkeeper/lotkeeperd.sock` or `/tmp/lotkeeper-$USER/lotkeeperd.sock`
//! - Config: `$XDG_CONFIG_HOME/lotkeeper/config.toml` or `~/.config/lotkeeper/config.toml`
//! - Data: `$XDG_DATA_HOME/lotkeeper` or `~/.local/share/lotkeeper`
//! - Logs: `$XDG_STATE_HOME/lotkeeper` or `~/.local/state/lotkeeper`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const LOTKEEPER_SOCKET_ENV: &str = "LOTKEEPER_SOCKET";

/// Environment variable for overriding the data directory
pub const LOTKEEPER_DATA_DIR_ENV: &str = "LOTKEEPER_DATA_DIR";

/// Socket filename within the socket directory
const SOCKET_FILENAME: &str = "lotkeeperd.sock";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "lotkeeper";

/// Resolve `$<xdg_var>/lotkeeper`, falling back to `~/<home_rel>/lotkeeper`,
/// then to `/tmp/lotkeeper/<last_resort>`.
fn xdg_dir(xdg_var: &str, home_rel: &[&str], last_resort: &str) -> PathBuf {
    if let Ok(dir) = std::env::var(xdg_var) {
        return PathBuf::from(dir).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        let mut path = PathBuf::from(home);
        path.extend(home_rel);
        return path.join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join(last_resort)
}

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$LOTKEEPER_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/lotkeeper/lotkeeperd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/lotkeeper-$USER/lotkeeperd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(LOTKEEPER_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the LOTKEEPER_SOCKET env var.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"], "config").join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// `$LOTKEEPER_DATA_DIR` wins over the XDG location.
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(LOTKEEPER_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the LOTKEEPER_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"], "data")
}

/// Get the default log directory.
pub fn default_log_dir() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", &[".local", "state"], "logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_app_name() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("lotkeeper"));
        assert!(path.to_string_lossy().ends_with(".sock"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("lotkeeper"));
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }

    #[test]
    fn data_and_log_dirs_contain_app_name() {
        assert!(data_dir_without_env().to_string_lossy().contains("lotkeeper"));
        assert!(default_log_dir().to_string_lossy().contains("lotkeeper"));
    }
}
