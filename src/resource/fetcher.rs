//! Resource Fetcher
//!
//! Paginated linear scans for endpoints that cannot look an object up
//! directly (deploy tokens, and variables on GitLab < 13.4).

use crate::error::Result;
use crate::gitlab::Page;
use std::future::Future;

/// Deploy token listings are requested 20 at a time
pub const DEPLOY_TOKEN_PAGE_SIZE: u32 = 20;

/// Walk pages starting at 1 until `matches` accepts an item or the remote
/// reports no next page.
pub async fn find_paginated<T, F, Fut, P>(mut fetch_page: F, mut matches: P) -> Result<Option<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
    P: FnMut(&T) -> bool,
{
    let mut page = 1;

    loop {
        tracing::trace!("fetching page {}", page);
        let result = fetch_page(page).await?;

        if let Some(found) = result.items.into_iter().find(|item| matches(item)) {
            return Ok(Some(found));
        }

        match result.next_page {
            Some(next) => page = next,
            None => return Ok(None),
        }
    }
}
