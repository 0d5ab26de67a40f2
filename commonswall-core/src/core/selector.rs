use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::database::{IdStore, PageId};

/// Pick the next image: favorites and never-shown ids first, otherwise any known id.
pub fn pick_page<R: Rng + ?Sized>(store: &IdStore, rng: &mut R) -> Result<Option<PageId>> {
    let preferred = store.preferred_ids()?;
    if let Some(id) = preferred.choose(rng) {
        return Ok(Some(*id));
    }
    Ok(store.all_ids()?.choose(rng).copied())
}
