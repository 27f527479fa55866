use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("arleg_scraper/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_SECS: u64 = 60;

/// A fetched member page, tagged with its position in the roster.
pub struct FetchedPage {
    pub index: usize,
    pub url: Url,
    pub html: String,
}

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Fetcher { client })
    }

    pub async fn get(&self, url: &Url) -> Result<String> {
        let start = Instant::now();
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("{} returned HTTP {}", url, status);
        }
        let text = resp
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        debug!(%url, ms = start.elapsed().as_millis() as u64, "fetched");
        Ok(text)
    }
}

/// Fetch member pages concurrently. Failed pages are logged and skipped; the
/// rest come back in roster order.
pub async fn fetch_pages(
    fetcher: &Fetcher,
    urls: Vec<Url>,
    concurrency: usize,
) -> Result<(Vec<FetchedPage>, FetchStats)> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = urls.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send results, main loop collects them
    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(usize, Url, Result<String>)>(concurrency.max(1) * 2);

    for (index, url) in urls.into_iter().enumerate() {
        let fetcher = fetcher.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let result = match sem.acquire().await {
                Ok(_permit) => fetcher.get(&url).await,
                Err(e) => Err(e.into()),
            };
            let _ = tx.send((index, url, result)).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut pages = Vec::with_capacity(total);
    let mut errors = 0usize;

    while let Some((index, url, result)) = rx.recv().await {
        match result {
            Ok(html) => pages.push(FetchedPage { index, url, html }),
            Err(e) => {
                warn!("Fetch failed for {}: {:#}", url, e);
                errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    pages.sort_by_key(|p| p.index);
    let ok = pages.len();
    info!("Fetched {} member pages ({} ok, {} errors)", total, ok, errors);

    Ok((pages, FetchStats { total, ok, errors }))
}
