mod config;
mod db;
mod fetch;
mod legislator;
mod parser;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::Datelike;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use rusqlite::Connection;
use tracing::{error, info, warn};

use config::ScraperConfig;
use fetch::Fetcher;
use legislator::{Chamber, LegislatorRecord};
use parser::member::ParsedMember;
use parser::ParseError;

#[derive(Parser)]
#[command(name = "arleg_scraper", about = "Arkansas General Assembly legislator scraper")]
struct Cli {
    /// JSON config file (defaults to built-in Arkansas settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// List configured terms
    Terms,
    /// Fetch the roster and every member page for a term, then save records
    Scrape {
        /// Term name, e.g. "2013-2014" (default: latest, or all when latest_only is off)
        #[arg(short, long)]
        term: Option<String>,
        /// Keep only members of this chamber (upper or lower)
        #[arg(short, long)]
        chamber: Option<Chamber>,
        /// Max member pages per term
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse a saved member page and print the record as JSON
    Parse {
        file: PathBuf,
        /// URL the page was fetched from
        #[arg(long)]
        url: String,
        #[arg(short, long, default_value = "lower")]
        chamber: Chamber,
        #[arg(short, long)]
        term: Option<String>,
    },
    /// Show database statistics
    Stats,
    /// Legislators overview table
    Overview {
        #[arg(short, long)]
        term: Option<String>,
        #[arg(short, long)]
        chamber: Option<Chamber>,
        /// Filter by party (Republican, Democratic, Green, Independent)
        #[arg(short, long)]
        party: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Print stored legislators as JSON lines
    Export {
        #[arg(short, long)]
        term: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = ScraperConfig::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Init => {
            let conn = open_db(&config)?;
            drop(conn);
            println!("Schema ready at {}", config.db_path);
            Ok(())
        }
        Commands::Terms => {
            let latest = config.latest_term().map(|t| t.name.as_str());
            let current = config
                .term_for_year(chrono::Local::now().year())
                .map(|t| t.name.as_str());
            for t in &config.terms {
                let mut marks = Vec::new();
                if Some(t.name.as_str()) == latest {
                    marks.push("latest");
                }
                if Some(t.name.as_str()) == current {
                    marks.push("current");
                }
                println!(
                    "{:<10} {}-{}  {}",
                    t.name,
                    t.start_year,
                    t.end_year,
                    marks.join(", ")
                );
            }
            Ok(())
        }
        Commands::Scrape {
            term,
            chamber,
            limit,
        } => {
            let conn = open_db(&config)?;
            let fetcher = Fetcher::new()?;
            let terms: Vec<String> = match term {
                Some(t) => vec![config.term(&t)?.name.clone()],
                None => config.default_terms().iter().map(|t| t.name.clone()).collect(),
            };
            if terms.is_empty() {
                println!("No terms configured.");
                return Ok(());
            }
            for term in &terms {
                let counts = scrape_term(&conn, &config, &fetcher, term, chamber, limit).await?;
                counts.print(term);
            }
            Ok(())
        }
        Commands::Parse {
            file,
            url,
            chamber,
            term,
        } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let term = match term {
                Some(t) => t,
                None => config
                    .latest_term()
                    .map(|t| t.name.clone())
                    .unwrap_or_default(),
            };
            let url = parser::urlescape(&url)?;
            let parsed = parser::member::parse_member(&html, url.as_str(), chamber, &term)?;
            for w in &parsed.warnings {
                eprintln!("warning: {}", w);
            }
            match parsed.record() {
                Some(leg) => println!("{}", serde_json::to_string_pretty(leg)?),
                None => println!("Dropped: {:?}", parsed.outcome),
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = open_db(&config)?;
            let s = db::get_stats(&conn)?;
            println!("Total:         {}", s.total);
            println!("Senate:        {}", s.upper);
            println!("House:         {}", s.lower);
            println!("Terms:         {}", s.terms);
            println!("Without photo: {}", s.without_photo);
            for (party, n) in &s.by_party {
                let party = if party.is_empty() { "(none)" } else { party.as_str() };
                println!("  {:<12} {}", party, n);
            }
            if let Some(ts) = s.last_scraped {
                println!("Last scraped:  {}", ts);
            }
            Ok(())
        }
        Commands::Overview {
            term,
            chamber,
            party,
            limit,
        } => {
            let conn = open_db(&config)?;
            let rows = db::fetch_overview(
                &conn,
                term.as_deref(),
                chamber.map(|c| c.as_str()),
                party.as_deref(),
                limit,
            )?;
            if rows.is_empty() {
                println!("No legislators found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<9} | {:<5} | {:>4} | {:<24} | {:<11} | {:<12} | {:<24}",
                "#", "Term", "Chamb", "Dist", "Name", "Party", "Phone", "Email"
            );
            println!("{}", "-".repeat(110));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<9} | {:<5} | {:>4} | {:<24} | {:<11} | {:<12} | {:<24}",
                    i + 1,
                    r.term,
                    r.chamber,
                    truncate(&r.district, 4),
                    truncate(&r.full_name, 24),
                    r.party,
                    r.phone.as_deref().unwrap_or("-"),
                    truncate(r.email.as_deref().unwrap_or("-"), 24),
                );
            }

            println!("\n{} legislators", rows.len());
            Ok(())
        }
        Commands::Export { term } => {
            let conn = open_db(&config)?;
            for leg in db::load_legislators(&conn, term.as_deref())? {
                println!("{}", serde_json::to_string(&leg)?);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_db(config: &ScraperConfig) -> anyhow::Result<Connection> {
    let conn = db::connect(&config.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

#[derive(Default)]
struct ScrapeCounts {
    listed: usize,
    fetch_errors: usize,
    saved: usize,
    dropped: usize,
    other_chamber: usize,
}

impl ScrapeCounts {
    fn print(&self, term: &str) {
        println!(
            "{}: {} listed, {} saved, {} dropped (no district), {} other chamber, {} fetch errors.",
            term, self.listed, self.saved, self.dropped, self.other_chamber, self.fetch_errors,
        );
    }
}

/// Roster → member pages → records for one term. Records are saved in roster
/// order; an unparseable party code aborts the rest of the term.
async fn scrape_term(
    conn: &Connection,
    config: &ScraperConfig,
    fetcher: &Fetcher,
    term: &str,
    chamber: Option<Chamber>,
    limit: Option<usize>,
) -> anyhow::Result<ScrapeCounts> {
    let roster_url = config.roster_url(term)?;
    info!(jurisdiction = %config.jurisdiction, %term, "Fetching roster: {}", roster_url);
    let roster_html = fetcher
        .get(&roster_url)
        .await
        .context("Failed to fetch roster page")?;

    let mut urls: Vec<url::Url> =
        parser::roster::extract_member_links(&roster_html, &roster_url).collect();
    if let Some(n) = limit {
        urls.truncate(n);
    }

    let mut counts = ScrapeCounts {
        listed: urls.len(),
        ..Default::default()
    };
    if urls.is_empty() {
        warn!(%term, "Roster lists no members");
        return Ok(counts);
    }

    let (pages, stats) = fetch::fetch_pages(fetcher, urls, config.concurrency).await?;
    counts.fetch_errors = stats.errors;
    info!(%term, "{} of {} member pages fetched", stats.ok, stats.total);

    let default_chamber = chamber.unwrap_or(Chamber::Lower);
    let results: Vec<_> = pages
        .par_iter()
        .map(|page| parser::process_page(page, term, default_chamber))
        .collect();

    save_parsed(
        conn,
        term,
        chamber,
        pages.iter().map(|p| p.url.as_str()).zip(results),
        &mut counts,
    )?;

    info!(%term, "Saved {} legislators", counts.saved);
    Ok(counts)
}

/// Save parsed members in order. Members of another chamber (when filtering)
/// and dropped members are only counted. The first parse error stops the
/// loop; everything before it is already saved.
fn save_parsed<'a>(
    conn: &Connection,
    term: &str,
    chamber: Option<Chamber>,
    results: impl IntoIterator<Item = (&'a str, Result<ParsedMember, ParseError>)>,
    counts: &mut ScrapeCounts,
) -> anyhow::Result<()> {
    for (url, result) in results {
        let parsed = result.map_err(|e| {
            error!(%url, "Aborting {}: {}", term, e);
            e
        })?;
        match parsed.into_record() {
            Some(leg) if chamber.is_some_and(|c| c != leg.chamber) => counts.other_chamber += 1,
            Some(leg) => {
                save(conn, &leg)?;
                counts.saved += 1;
            }
            None => counts.dropped += 1,
        }
    }
    Ok(())
}

fn save(conn: &Connection, leg: &LegislatorRecord) -> anyhow::Result<()> {
    db::save_legislator(conn, leg)
        .with_context(|| format!("Failed to save {} ({})", leg.full_name, leg.source_url))?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
