use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

pub const API_URL: &str = "https://commons.wikimedia.org/w/api.php";
pub const PAGE_URL_BASE: &str = "https://commons.wikimedia.org/w/?curid=";
pub const DEFAULT_FETCH_AMOUNT: usize = 100;
pub const USER_AGENT: &str = concat!("commonswall/", env!("CARGO_PKG_VERSION"));

/// Paths and endpoints shared by every component. Built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub images_dir: PathBuf,
    pub db_file: PathBuf,
    pub logs_dir: PathBuf,
    pub log_file: PathBuf,

    pub api_url: String,
    pub page_url_base: String,
    pub user_agent: String,
    pub default_fetch_amount: usize,
}

impl Config {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("org", "commonswall", "commonswall")
            .ok_or(CoreError::NoProjectDirs)?;
        Ok(Self::with_root(proj_dirs.data_dir()))
    }

    /// Lay out the fixed relative paths under `root`.
    pub fn with_root(root: &Path) -> Self {
        let data_dir = root.to_path_buf();
        let images_dir = data_dir.join("images");
        let db_file = data_dir.join("images.db");
        let logs_dir = data_dir.join("logs");
        let log_file = logs_dir.join("common-desktop.log");

        Config {
            data_dir,
            images_dir,
            db_file,
            logs_dir,
            log_file,
            api_url: API_URL.to_string(),
            page_url_base: PAGE_URL_BASE.to_string(),
            user_agent: USER_AGENT.to_string(),
            default_fetch_amount: DEFAULT_FETCH_AMOUNT,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.images_dir, &self.logs_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
