use std::path::PathBuf;

const APP_DIR: &str = "wavetty";

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/wavetty/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(not(unix))]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn data_dir() -> PathBuf {
    // ~/.local/share/wavetty/ (XDG standard) on macOS and Linux alike
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(not(unix))]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

/// Log file. Stdout belongs to the visualization, so tracing goes here.
pub fn log_path() -> PathBuf {
    data_dir().join("wavetty.log")
}
