//! Crawler for sources that publish raw records as JSON
//!
//! The document at the source URL is either an array of records or an object
//! holding the array under `items` (override with the `items-key` config key).

use crate::crawler::{CrawlCounts, Crawler, CrawlerContext, FetchClient};
use crate::model::RawRecord;
use crate::pipeline::RecordPipeline;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde_json::Value;

const DEFAULT_ITEMS_KEY: &str = "items";

/// Ingests a JSON feed served at the bound source's URL
pub struct JsonFeedCrawler {
    pipeline: RecordPipeline,
    fetcher: FetchClient,
    url: Option<String>,
    items_key: String,
}

impl JsonFeedCrawler {
    pub const NAME: &'static str = "json-feed";

    pub fn new(ctx: CrawlerContext) -> Self {
        let url = ctx.source.as_ref().map(|s| s.url.clone());
        let items_key = ctx
            .source
            .as_ref()
            .and_then(|s| s.config.get("items-key"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ITEMS_KEY)
            .to_string();

        Self {
            pipeline: ctx.pipeline,
            fetcher: ctx.fetcher,
            url,
            items_key,
        }
    }
}

/// Pulls the record array out of a feed document
fn feed_items(document: Value, items_key: &str) -> anyhow::Result<Vec<Value>> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(items_key) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => bail!("feed field '{}' is not an array", items_key),
            None => bail!("feed object has no '{}' array", items_key),
        },
        _ => bail!("feed is neither an array nor an object"),
    }
}

#[async_trait]
impl Crawler for JsonFeedCrawler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&mut self) -> anyhow::Result<CrawlCounts> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("{} needs a data source with a URL", Self::NAME))?;

        let body = self.fetcher.fetch(url).await?;
        let document: Value =
            serde_json::from_str(&body).with_context(|| format!("invalid JSON from {}", url))?;
        let items = feed_items(document, &self.items_key)?;

        tracing::info!("Feed {} returned {} records", url, items.len());

        let mut counts = CrawlCounts::default();
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<RawRecord>(item) {
                Ok(record) => counts.record(self.pipeline.ingest(&record)),
                Err(e) => {
                    counts.items_found += 1;
                    tracing::warn!("Skipping malformed record {} from {}: {}", index, url, e);
                }
            }
        }

        Ok(counts)
    }
}
