pub mod core;
pub mod error;
pub mod services;
pub mod wallpaper;

pub use crate::core::app::{category_title, WallpaperApp};
pub use crate::core::cache::ImageCache;
pub use crate::core::database::{IdStore, ImageRecord, PageId, Status};
pub use crate::core::request::{CommonsClient, Continuation, HttpTransport, PageIds};
pub use crate::core::selector::pick_page;
pub use crate::core::storage::{Config, DEFAULT_FETCH_AMOUNT};
pub use crate::error::CoreError;
pub use crate::services::{CommandRunner, DefaultServiceProvider, SessionDetector, Transport};
pub use crate::wallpaper::{BackgroundSetter, DesktopSession};
