use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use rand::Rng;

use crate::core::cache::ImageCache;
use crate::core::database::{IdStore, PageId, Status};
use crate::core::request::{CommonsClient, HttpTransport};
use crate::core::selector::pick_page;
use crate::core::storage::Config;
use crate::services::{CommandRunner, DefaultServiceProvider, SessionDetector, Transport};
use crate::wallpaper::BackgroundSetter;

const CATEGORY_PREFIX: &str = "Category:";

/// Prefix `Category:` unless the name already carries it.
pub fn category_title(name: &str) -> String {
    if name.starts_with(CATEGORY_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", CATEGORY_PREFIX, name)
    }
}

/// Everything one invocation needs, wired from a [`Config`].
pub struct WallpaperApp<T: Transport = HttpTransport, S = DefaultServiceProvider> {
    config: Config,
    store: IdStore,
    cache: ImageCache,
    client: CommonsClient<T>,
    setter: BackgroundSetter<S>,
}

impl WallpaperApp {
    pub fn new(config: Config) -> Result<Self> {
        config.ensure_dirs()?;
        let store = IdStore::open(&config.db_file)?;
        let client = CommonsClient::new(HttpTransport::new(&config));
        Ok(Self::with_parts(config, store, client, BackgroundSetter::new()))
    }
}

impl<T: Transport, S: SessionDetector + CommandRunner> WallpaperApp<T, S> {
    pub fn with_parts(
        config: Config,
        store: IdStore,
        client: CommonsClient<T>,
        setter: BackgroundSetter<S>,
    ) -> Self {
        let cache = ImageCache::new(&config.images_dir);
        WallpaperApp {
            config,
            store,
            cache,
            client,
            setter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &IdStore {
        &self.store
    }

    pub fn setter(&self) -> &BackgroundSetter<S> {
        &self.setter
    }

    /// Add up to `amount` new page ids from `category` and its sub-categories.
    pub fn populate(&self, category: &str, amount: usize) -> Result<usize> {
        let mut added = 0;
        if amount == 0 {
            return Ok(added);
        }

        for page_id in self.client.page_ids(category) {
            let page_id = page_id?;
            if self.store.insert_if_absent(page_id)? {
                info!("Added page id to database: {}", page_id);
                added += 1;
                if added == amount {
                    break;
                }
            } else {
                info!("Id {} already exists, skipping.", page_id);
            }
        }

        info!("Added {} new pages to database.", added);
        Ok(added)
    }

    /// Rotate to the next image. Returns the id now shown, if any.
    pub fn change_image<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<PageId>> {
        if let Some(old_id) = self.store.get_current()? {
            if self.store.status(old_id)? != Some(Status::Favorite) {
                self.cache.remove(old_id)?;
            }
            self.store.mark_shown(old_id, Utc::now())?;
        }

        let Some(page_id) = pick_page(&self.store, rng)? else {
            info!("No new image to switch to, keeping current one.");
            return Ok(None);
        };

        let image_path = match self.cache.exists(page_id)? {
            Some(path) => path,
            None => {
                let url = self.client.image_url(page_id)?;
                self.cache.fetch(page_id, &url, self.client.transport())?
            }
        };

        self.setter.set_wallpaper(&image_path)?;
        self.store.set_current(page_id)?;
        info!("Now showing page id {}", page_id);
        Ok(Some(page_id))
    }

    /// Set the status of the current image. Returns its id, if there is one.
    pub fn set_current_status(&self, status: Status) -> Result<Option<PageId>> {
        let Some(current_id) = self.store.get_current()? else {
            warn!("No current image, status {:?} not applied.", status);
            return Ok(None);
        };
        info!(
            "Setting status of current image (id={}) to: {:?}.",
            current_id, status
        );
        self.store.set_status(current_id, status)?;
        Ok(Some(current_id))
    }

    /// Commons page of the current image.
    pub fn current_page_url(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get_current()?
            .map(|id| format!("{}{}", self.config.page_url_base, id)))
    }
}
