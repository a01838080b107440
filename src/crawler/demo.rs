//! Synthetic crawler that stands in for a real site
//!
//! Each run picks a random subset of built-in listings, gives every one a
//! fresh deadline, and feeds them through the pipeline with a small pause
//! between items. Source config keys:
//!
//! - `item-delay-ms`: pause between items (default 500)
//! - `seed`: fixes the random choices, for reproducible runs

use crate::crawler::{CrawlCounts, Crawler, CrawlerContext};
use crate::model::RawRecord;
use crate::pipeline::RecordPipeline;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::time::Duration;

const DEFAULT_ITEM_DELAY_MS: u64 = 500;
const MIN_ITEMS: usize = 3;

struct Template {
    title: &'static str,
    description: &'static str,
    type_hint: Option<&'static str>,
    organizer: &'static str,
    location: &'static str,
    website: &'static str,
    contact: &'static str,
    fee: Option<f64>,
    prize: &'static str,
    tags: &'static [&'static str],
}

const TEMPLATES: &[Template] = &[
    Template {
        title: "Riverside Photography Exhibition 2025",
        description: "Open call for documentary and fine-art photographers. Selected works hang for six weeks in the riverside gallery.",
        type_hint: None,
        organizer: "Riverside Arts Center",
        location: "Portland, OR",
        website: "https://riverside-arts.example/open-call",
        contact: "submissions@riverside-arts.example / (503) 555-0142",
        fee: Some(25.0),
        prize: "Exhibition and catalogue feature",
        tags: &["photography", "exhibition", "documentary"],
    },
    Template {
        title: "Northern Lights Artist Residency",
        description: "A three-month studio residency for mid-career artists working with light and time.",
        type_hint: Some("RESIDENCY"),
        organizer: "Polar Studio Collective",
        location: "Tromsø, Norway",
        website: "https://polarstudio.example/residency",
        contact: "residency@polarstudio.example",
        fee: None,
        prize: "Studio, housing and monthly stipend",
        tags: &["residency", "light art"],
    },
    Template {
        title: "International Illustration Award",
        description: "Annual contest for picture-book and editorial illustrators. Shortlisted entries are judged by a panel of publishers.",
        type_hint: None,
        organizer: "Inkwell Foundation",
        location: "Online",
        website: "https://inkwell.example/award",
        contact: "award@inkwell.example",
        fee: Some(40.0),
        prize: "$5,000 first prize",
        tags: &["illustration", "competition"],
    },
    Template {
        title: "Emerging Sculptors Fund",
        description: "Project funding for sculptors within five years of graduation.",
        type_hint: None,
        organizer: "Meridian Trust",
        location: "London, UK",
        website: "https://meridian-trust.example/fund",
        contact: "Email grants@meridian-trust.example or call +1 212 555 0199",
        fee: None,
        prize: "Up to 8,000 per project",
        tags: &["sculpture", "grant"],
    },
    Template {
        title: "Sound and Space Symposium",
        description: "Call for papers and performances on spatial audio, acoustics and listening practices.",
        type_hint: Some("CONFERENCE"),
        organizer: "Institute for Sonic Arts",
        location: "Berlin, Germany",
        website: "https://sonic-arts.example/symposium",
        contact: "papers@sonic-arts.example",
        fee: Some(0.0),
        prize: "Travel support for selected speakers",
        tags: &["sound", "academic"],
    },
    Template {
        title: "城市记忆当代艺术展览征集",
        description: "面向青年艺术家征集以城市记忆为主题的绘画、影像与装置作品，入选作品将在美术馆展出。",
        type_hint: None,
        organizer: "上海当代艺术中心",
        location: "上海",
        website: "https://sh-contemporary.example/call",
        contact: "call@sh-contemporary.example 电话 021-5555-0101",
        fee: None,
        prize: "入选作品展出及画册收录",
        tags: &["当代艺术", "展览"],
    },
    Template {
        title: "山谷艺术家驻留计划",
        description: "为期两个月的乡村驻地项目，提供工作室与住宿，欢迎各媒介艺术家申请。",
        type_hint: None,
        organizer: "云岭艺术基金会",
        location: "云南大理",
        website: "https://yunling-art.example/residency",
        contact: "apply@yunling-art.example",
        fee: None,
        prize: "免费食宿与创作补贴",
        tags: &["驻留", "乡村"],
    },
    Template {
        title: "Zine Makers Open Call",
        description: "Send us your self-published zines for a touring reading room.",
        type_hint: None,
        organizer: "Paper Route Press",
        location: "Toronto, Canada",
        website: "https://paperroute.example/zines",
        contact: "hello@paperroute.example",
        fee: None,
        prize: "Inclusion in the touring collection",
        tags: &["zines", "publishing"],
    },
];

/// Generates synthetic open-call listings
pub struct DemoCrawler {
    pipeline: RecordPipeline,
    item_delay: Duration,
    rng: StdRng,
}

impl DemoCrawler {
    pub const NAME: &'static str = "demo";

    pub fn new(ctx: CrawlerContext) -> Self {
        let config = ctx.source.as_ref().map(|s| &s.config);

        let item_delay = config
            .and_then(|c| c.get("item-delay-ms"))
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_ITEM_DELAY_MS);

        let rng = match config.and_then(|c| c.get("seed")).and_then(|v| v.as_u64()) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::rng().random()),
        };

        Self {
            pipeline: ctx.pipeline,
            item_delay: Duration::from_millis(item_delay),
            rng,
        }
    }

    /// Picks between `MIN_ITEMS` and all templates, each with a deadline 30 to 180 days out
    fn generate(&mut self) -> Vec<RawRecord> {
        let count = self.rng.random_range(MIN_ITEMS..=TEMPLATES.len());
        let picked: Vec<&Template> = TEMPLATES.choose_multiple(&mut self.rng, count).collect();

        picked
            .into_iter()
            .map(|template| {
                let days_ahead = self.rng.random_range(30..=180);
                let deadline = Utc::now() + ChronoDuration::days(days_ahead);
                template_record(template, deadline.format("%Y-%m-%d").to_string())
            })
            .collect()
    }
}

fn template_record(template: &Template, deadline: String) -> RawRecord {
    RawRecord {
        title: Some(template.title.to_string()),
        description: Some(template.description.to_string()),
        type_hint: template.type_hint.map(str::to_string),
        organizer: Some(template.organizer.to_string()),
        deadline: Some(deadline),
        location: Some(template.location.to_string()),
        website: Some(template.website.to_string()),
        contact: Some(template.contact.to_string()),
        fee: template.fee.map(|fee| json!(fee)),
        prize: Some(template.prize.to_string()),
        requirements: json!({
            "format": "digital",
            "language": "en/zh",
        }),
        tags: json!(template.tags),
    }
}

#[async_trait]
impl Crawler for DemoCrawler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&mut self) -> anyhow::Result<CrawlCounts> {
        let records = self.generate();
        tracing::info!("Demo crawler generated {} listings", records.len());

        let mut counts = CrawlCounts::default();
        for (index, record) in records.iter().enumerate() {
            if index > 0 && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
            counts.record(self.pipeline.ingest(record));
        }

        Ok(counts)
    }
}
