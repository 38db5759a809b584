use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "FLOWPAPER_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Flowpaper";
const APPLICATION: &str = "flowpaper";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        Self::resolve(env_override(ENV_CONFIG_DIR), || {
            ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
                .map(|dirs| dirs.config_dir().to_path_buf())
        })
    }

    /// Prefers `override_dir`, falling back to the platform config directory.
    fn resolve(
        override_dir: Option<PathBuf>,
        platform_dir: impl FnOnce() -> Option<PathBuf>,
    ) -> Result<Self> {
        let config_dir = match override_dir {
            Some(dir) => dir,
            None => platform_dir().ok_or_else(|| anyhow!("failed to determine user directories"))?,
        };
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
