//! Application paths management.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Manages all application paths following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    /// Cache index and record files.
    pub cache_dir: PathBuf,
    /// Root of the temp workspace (downloads, frames, audio).
    pub temp_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "vidgist", "vidgist")?;

        let config_dir = proj_dirs.config_dir().to_path_buf();
        let data_dir = proj_dirs.data_dir().to_path_buf();

        Some(Self::with_dirs(config_dir, data_dir))
    }

    fn with_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            cache_dir: data_dir.join("cache"),
            temp_dir: data_dir.join("temp"),
            log_dir: data_dir.join("logs"),
            config_dir,
            data_dir,
        }
    }

    /// Re-root the data directories at `data_dir` (`~` is expanded).
    ///
    /// The config file location does not move.
    pub fn with_data_dir(&self, data_dir: Option<&str>) -> Self {
        match data_dir {
            Some(dir) if !dir.trim().is_empty() => {
                let expanded = shellexpand::tilde(dir.trim()).to_string();
                Self::with_dirs(self.config_dir.clone(), PathBuf::from(expanded))
            }
            _ => self.clone(),
        }
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::create_dir_all(&self.temp_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// Check if vidgist has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}
