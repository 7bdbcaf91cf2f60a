//! Paged article list of one column
//!
//! Accumulates pages as the reader scrolls. A response is applied only when
//! it answers the page the feed is currently waiting for, so a refresh that
//! overtakes an older request is not clobbered by it.

use super::error::ClientResult;
use super::mp::{MpClient, DEFAULT_PAGE_SIZE};
use crate::models::{ArticleSummary, Paged};

#[derive(Debug, Clone)]
pub struct ArticleFeed {
    column_id: i64,
    page_size: u32,
    items: Vec<ArticleSummary>,
    /// Last page applied, 0 before the first load
    loaded_page: u32,
    total: Option<u64>,
    pending: Option<u32>,
}

impl ArticleFeed {
    pub fn new(column_id: i64) -> Self {
        Self::with_page_size(column_id, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(column_id: i64, page_size: u32) -> Self {
        Self {
            column_id,
            page_size: page_size.max(1),
            items: Vec::new(),
            loaded_page: 0,
            total: None,
            pending: None,
        }
    }

    pub fn column_id(&self) -> i64 {
        self.column_id
    }

    pub fn items(&self) -> &[ArticleSummary] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total.unwrap_or(0)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// True until the accumulated count reaches the reported total
    pub fn has_more(&self) -> bool {
        match self.total {
            None => true,
            Some(total) => (self.items.len() as u64) < total,
        }
    }

    /// Page to request next, or `None` while loading or when exhausted.
    /// Marks that page as pending.
    pub fn begin_next(&mut self) -> Option<u32> {
        if self.is_loading() || !self.has_more() {
            return None;
        }
        let page = self.loaded_page + 1;
        self.pending = Some(page);
        Some(page)
    }

    /// Start over from page 1, dropping whatever was pending
    pub fn begin_refresh(&mut self) -> u32 {
        self.pending = Some(1);
        1
    }

    /// Apply a page; returns false when the response is stale
    pub fn apply(&mut self, page: u32, response: Paged<ArticleSummary>) -> bool {
        if self.pending != Some(page) {
            tracing::debug!(column_id = self.column_id, page, "Ignoring stale page");
            return false;
        }

        if page == 1 {
            self.items = response.list;
        } else {
            self.items.extend(response.list);
        }
        self.loaded_page = page;
        self.total = Some(response.total);
        self.pending = None;
        true
    }

    /// Forget a failed request so the page can be asked for again
    pub fn fail(&mut self, page: u32) {
        if self.pending == Some(page) {
            self.pending = None;
        }
    }

    /// Fetch the next page through `client`. Ok(false) when nothing was due.
    pub async fn load_more(&mut self, client: &MpClient) -> ClientResult<bool> {
        let Some(page) = self.begin_next() else {
            return Ok(false);
        };
        self.fetch(client, page).await
    }

    /// Reload from page 1
    pub async fn refresh(&mut self, client: &MpClient) -> ClientResult<bool> {
        let page = self.begin_refresh();
        self.fetch(client, page).await
    }

    async fn fetch(&mut self, client: &MpClient, page: u32) -> ClientResult<bool> {
        match client.column_articles(self.column_id, page, self.page_size).await {
            Ok(response) => Ok(self.apply(page, response)),
            Err(e) => {
                self.fail(page);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summaries(ids: std::ops::Range<i64>) -> Vec<ArticleSummary> {
        ids.map(|id| ArticleSummary {
            id,
            title: format!("article {id}"),
            thumbnail: String::new(),
            author: String::new(),
            view_count: 0,
            created_at: Utc::now(),
        })
        .collect()
    }

    fn page(list: Vec<ArticleSummary>, page: u32, total: u64) -> Paged<ArticleSummary> {
        Paged {
            list,
            total,
            page,
            page_size: 10,
        }
    }

    #[test]
    fn test_pages_append_in_order() {
        let mut feed = ArticleFeed::new(3);
        assert!(feed.has_more());

        assert_eq!(feed.begin_next(), Some(1));
        assert_eq!(feed.begin_next(), None, "no second request while loading");
        assert!(feed.apply(1, page(summaries(0..10), 1, 15)));
        assert!(feed.has_more());

        assert_eq!(feed.begin_next(), Some(2));
        assert!(feed.apply(2, page(summaries(10..15), 2, 15)));

        let ids: Vec<i64> = feed.items().iter().map(|a| a.id).collect();
        assert_eq!(ids, (0..15).collect::<Vec<_>>());
        assert!(!feed.has_more());
        assert_eq!(feed.begin_next(), None);
    }

    #[test]
    fn test_stale_page_is_ignored() {
        let mut feed = ArticleFeed::new(3);
        feed.begin_next();
        feed.apply(1, page(summaries(0..10), 1, 30));
        assert_eq!(feed.begin_next(), Some(2));

        // Pull-to-refresh overtakes the page 2 request
        assert_eq!(feed.begin_refresh(), 1);
        assert!(!feed.apply(2, page(summaries(10..20), 2, 30)));
        assert!(feed.apply(1, page(summaries(100..110), 1, 30)));
        assert_eq!(feed.items().len(), 10);
        assert_eq!(feed.items()[0].id, 100);
    }

    #[test]
    fn test_failed_page_can_be_retried() {
        let mut feed = ArticleFeed::new(1);
        assert_eq!(feed.begin_next(), Some(1));
        feed.fail(1);
        assert!(!feed.is_loading());
        assert_eq!(feed.begin_next(), Some(1));
    }

    #[test]
    fn test_empty_column_has_no_more() {
        let mut feed = ArticleFeed::new(1);
        feed.begin_next();
        feed.apply(1, page(Vec::new(), 1, 0));
        assert!(!feed.has_more());
        assert_eq!(feed.total(), 0);
    }
}
