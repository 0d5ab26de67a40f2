// Commonswall error types

use thiserror::Error;

use crate::core::database::PageId;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No supported desktop session detected (looked for {0})")]
    NoDesktopSession(String),

    #[error("No image info returned for page id {0}")]
    MissingImageInfo(PageId),

    #[error("Command `{0}` did not exit successfully")]
    CommandFailed(String),

    #[error("Failed to get project directories")]
    NoProjectDirs,
}
