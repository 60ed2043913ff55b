//! Thin REST reads against the persistence collaborator.
//!
//! Only the two endpoints the inquiry views need: the caller's inquiries and
//! the unread summary. Both are bearer-authenticated GETs.

use anyhow::{Context, Result};
use estate_core::{Inquiry, UnreadSummary};
use url::Url;

pub struct ChatApi {
    http: reqwest::Client,
    base: Url,
    bearer: String,
}

impl ChatApi {
    pub fn new(base: Url, bearer: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            bearer: bearer.into(),
        }
    }

    /// Fetches every inquiry the authenticated user participates in.
    pub async fn my_inquiries(&self) -> Result<Vec<Inquiry>> {
        let url = self
            .base
            .join("api/inquiries/my")
            .context("building my-inquiries url")?;
        self.http
            .get(url)
            .bearer_auth(&self.bearer)
            .send()
            .await
            .context("requesting my inquiries")?
            .error_for_status()
            .context("my-inquiries request rejected")?
            .json()
            .await
            .context("decoding my inquiries")
    }

    /// Fetches the aggregate and per-inquiry unread counts.
    pub async fn unread_summary(&self) -> Result<UnreadSummary> {
        let url = self
            .base
            .join("api/chat/unread-count")
            .context("building unread-count url")?;
        self.http
            .get(url)
            .bearer_auth(&self.bearer)
            .send()
            .await
            .context("requesting unread summary")?
            .error_for_status()
            .context("unread-count request rejected")?
            .json()
            .await
            .context("decoding unread summary")
    }
}
