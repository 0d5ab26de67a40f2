use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;

use crate::core::database::PageId;
use crate::core::storage::Config;
use crate::error::CoreError;
use crate::services::Transport;

pub const NAMESPACE_FILE: i64 = 6;
pub const NAMESPACE_CATEGORY: i64 = 14;
const CATEGORY_PAGE_LIMIT: &str = "500";

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryMember {
    pub pageid: PageId,
    pub ns: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Continuation {
    #[serde(rename = "continue")]
    pub token: String,
    #[serde(default)]
    pub cmcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryMembersQuery {
    pub categorymembers: Vec<CategoryMember>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryMembersResponse {
    pub query: CategoryMembersQuery,
    #[serde(rename = "continue", default)]
    pub continuation: Option<Continuation>,
}

#[derive(Debug, Deserialize)]
pub struct ImageInfo {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ImagePage {
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ImageInfoQuery {
    pub pages: BTreeMap<String, ImagePage>,
}

#[derive(Debug, Deserialize)]
pub struct ImageInfoResponse {
    pub query: ImageInfoQuery,
}

/// Blocking HTTP transport against the Commons API endpoint.
pub struct HttpTransport {
    api_url: String,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        HttpTransport {
            api_url: config.api_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, params: &[(String, String)]) -> Result<String> {
        debug!("REQUEST: {} {:?}", self.api_url, params);
        let response = attohttpc::get(&self.api_url)
            .params(params)
            .header("User-Agent", self.user_agent.as_str())
            .send()
            .with_context(|| format!("Request to {} failed", self.api_url))?
            .error_for_status()?;
        let text = response.text()?;
        debug!("RESPONSE: {}", text);
        Ok(text)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let response = attohttpc::get(url)
            .header("User-Agent", self.user_agent.as_str())
            .send()
            .with_context(|| format!("Download of {} failed", url))?
            .error_for_status()?;
        let bytes = response.bytes()?;
        fs::write(dest, bytes).with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(())
    }
}

/// Typed queries on top of a [`Transport`].
pub struct CommonsClient<T: Transport> {
    transport: T,
}

impl<T: Transport> CommonsClient<T> {
    pub fn new(transport: T) -> Self {
        CommonsClient { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn category_members(
        &self,
        category: &str,
        continuation: Option<&Continuation>,
    ) -> Result<CategoryMembersResponse> {
        let mut params = vec![
            param("action", "query"),
            param("format", "json"),
            param("list", "categorymembers"),
            param("cmtitle", category),
            param("cmtype", "file|subcat"),
            param("cmlimit", CATEGORY_PAGE_LIMIT),
        ];
        match continuation {
            Some(cont) => {
                params.push(param("continue", &cont.token));
                if let Some(cmcontinue) = &cont.cmcontinue {
                    params.push(param("cmcontinue", cmcontinue));
                }
            }
            None => params.push(param("continue", "")),
        }

        let body = self.transport.get_json(&params)?;
        serde_json::from_str(&body)
            .with_context(|| format!("Failed to decode category listing for {}", category))
    }

    pub fn image_url(&self, page_id: PageId) -> Result<String> {
        let params = [
            param("action", "query"),
            param("format", "json"),
            param("pageids", &page_id.to_string()),
            param("prop", "imageinfo"),
            param("iiprop", "url"),
        ];
        let body = self.transport.get_json(&params)?;
        let response: ImageInfoResponse = serde_json::from_str(&body)
            .with_context(|| format!("Failed to decode image info for {}", page_id))?;

        response
            .query
            .pages
            .into_values()
            .next()
            .and_then(|page| page.imageinfo.into_iter().next())
            .map(|info| info.url)
            .ok_or_else(|| CoreError::MissingImageInfo(page_id).into())
    }

    /// Lazily walk `category` and its sub-categories depth-first.
    pub fn page_ids<'a>(&'a self, category: &str) -> PageIds<'a, T> {
        PageIds {
            client: self,
            stack: vec![Frame::new(category.to_string())],
            visited: HashSet::from([category.to_string()]),
        }
    }
}

fn param(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

struct Frame {
    category: String,
    pending: VecDeque<CategoryMember>,
    next_page: Option<Option<Continuation>>,
}

impl Frame {
    fn new(category: String) -> Self {
        Frame {
            category,
            pending: VecDeque::new(),
            // Some(None): first page not fetched yet
            next_page: Some(None),
        }
    }
}

/// Iterator over file page ids of a category tree. Each category is listed at
/// most once, so cycles in the category graph end. Fused after the first error.
pub struct PageIds<'a, T: Transport> {
    client: &'a CommonsClient<T>,
    stack: Vec<Frame>,
    visited: HashSet<String>,
}

impl<T: Transport> Iterator for PageIds<'_, T> {
    type Item = Result<PageId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;

            if let Some(member) = frame.pending.pop_front() {
                match member.ns {
                    NAMESPACE_FILE => return Some(Ok(member.pageid)),
                    NAMESPACE_CATEGORY => match member.title {
                        Some(title) if self.visited.insert(title.clone()) => {
                            debug!("Descending into {}", title);
                            self.stack.push(Frame::new(title));
                        }
                        Some(title) => debug!("Already visited {}, skipping", title),
                        None => warn!("Sub-category {} has no title, skipping", member.pageid),
                    },
                    _ => {}
                }
                continue;
            }

            match frame.next_page.take() {
                Some(continuation) => {
                    match self.client.category_members(&frame.category, continuation.as_ref()) {
                        Ok(response) => {
                            frame.pending.extend(response.query.categorymembers);
                            frame.next_page = response.continuation.map(Some);
                        }
                        Err(e) => {
                            self.stack.clear();
                            return Some(Err(e));
                        }
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
