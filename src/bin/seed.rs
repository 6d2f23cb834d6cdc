// src/bin/seed.rs
use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};

// --- ANSI colours ---
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

const TITLES: &[&str] = &[
    "Wedding dance",
    "Harbour at dawn",
    "First snow",
    "Street market",
    "Old lighthouse",
];

// --- Payloads ---

#[derive(Serialize)]
struct PhotoPayload<'a> {
    link: String,
    title: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentPayload {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment_id: Option<i64>,
}

#[derive(Deserialize)]
struct Created {
    id: i64,
}

#[derive(Default)]
struct SeedSummary {
    photos: u32,
    comments: u32,
    replies: u32,
    failures: Vec<String>,
}

// --- Seeder ---

struct Seeder {
    base_url: String,
    client: Client,
    summary: SeedSummary,
}

impl Seeder {
    fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            client,
            summary: SeedSummary::default(),
        })
    }

    async fn check_service_health(&self) -> bool {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<i64> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("POST {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            bail!("POST {} returned HTTP {} - {}", path, status, body);
        }

        let created: Created = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response of POST {}", path))?;
        Ok(created.id)
    }

    /// One photo, two comments and a reply to the first comment
    async fn seed_photo(&mut self, index: usize) -> Result<()> {
        let title = TITLES[index % TITLES.len()];
        let photo_id = self
            .post(
                "/photos",
                &PhotoPayload {
                    link: format!("https://photos.example.com/{}.jpg", index + 1),
                    title,
                },
            )
            .await?;
        self.summary.photos += 1;

        let comments_path = format!("/photos/{}/comments", photo_id);
        let mut first_comment = None;
        for n in 1..=2 {
            let id = self
                .post(
                    &comments_path,
                    &CommentPayload {
                        text: format!("Comment {} on {}", n, title),
                        comment_id: None,
                    },
                )
                .await?;
            first_comment.get_or_insert(id);
            self.summary.comments += 1;
        }

        self.post(
            &comments_path,
            &CommentPayload {
                text: format!("Reply on {}", title),
                comment_id: first_comment,
            },
        )
        .await?;
        self.summary.replies += 1;
        Ok(())
    }

    async fn run(&mut self, photo_count: usize) -> Result<()> {
        println!("\n{}🔍 Checking service status...{}", CYAN, RESET);
        if !self.check_service_health().await {
            bail!(
                "service unavailable at {}; ensure social-photos is running (cargo run)",
                self.base_url
            );
        }
        println!("{}✅ Service available{}\n", GREEN, RESET);

        let start_time = Instant::now();
        for index in 0..photo_count {
            println!("{}[{}/{}] Seeding photo...{}", CYAN, index + 1, photo_count, RESET);
            if let Err(e) = self.seed_photo(index).await {
                println!("{}❌ {}{}", RED, e, RESET);
                self.summary.failures.push(format!("{:#}", e));
            }
        }

        self.print_summary(start_time.elapsed().as_secs_f64());
        Ok(())
    }

    fn print_summary(&self, duration: f64) {
        println!("\n{}📋 Seed Summary{}", BOLD, RESET);
        println!("  • Photos created: {}{}{}", GREEN, self.summary.photos, RESET);
        println!("  • Comments created: {}{}{}", GREEN, self.summary.comments, RESET);
        println!("  • Replies created: {}{}{}", GREEN, self.summary.replies, RESET);
        if !self.summary.failures.is_empty() {
            println!(
                "  • Failures: {}{}{}",
                YELLOW,
                self.summary.failures.len(),
                RESET
            );
        }
        println!("  • Total Duration: {:.1}s", duration);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let base_url =
        env::var("SEED_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let photo_count: usize = match env::var("SEED_PHOTOS") {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("SEED_PHOTOS must be a number, got `{}`", raw))?,
        Err(_) => 5,
    };

    let mut seeder = Seeder::new(base_url.trim_end_matches('/').to_string())?;
    seeder.run(photo_count).await
}
