mod config;

pub use config::{BackendConfig, Config, NotificationsConfig};

use std::path::PathBuf;

/// Returns the configuration directory.
///
/// `FOCUSDESK_CONFIG_DIR` wins outright. Otherwise `~/.config/focusdesk[-dev]/`,
/// with `FOCUSDESK_ENV=dev` selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSDESK_CONFIG_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSDESK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusdesk-dev")
            } else {
                base_dir.join("focusdesk")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
