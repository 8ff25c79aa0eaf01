use std::path::PathBuf;

pub const DAEMON_TCP_PORT: u16 = 9877;
const APP_DIR: &str = "radio-nowplaying";

/// `~/.local/share/radio-nowplaying` on unix, the local app-data dir elsewhere.
pub fn data_dir() -> PathBuf {
    #[cfg(unix)]
    let base = dirs::home_dir().map(|home| home.join(".local").join("share"));
    #[cfg(not(unix))]
    let base = dirs::data_local_dir();

    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

/// `~/.config/radio-nowplaying` on unix, the platform config dir elsewhere.
pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    let base = dirs::home_dir().map(|home| home.join(".config"));
    #[cfg(not(unix))]
    let base = dirs::config_dir();

    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}
