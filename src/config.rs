use std::path::Path;

use serde::Deserialize;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://www.arkleg.state.ar.us";
const DEFAULT_DB_PATH: &str = "data/arleg.sqlite";
const ROSTER_PATH: &str =
    "assembly/{year}/{year}R/Pages/LegislatorSearchResults.aspx?member=&committee=All&chamber=";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No data for period: term '{0}' is not configured")]
    NoDataForPeriod(String),
    #[error("Invalid base url '{url}': {source}")]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TermMeta {
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
}

/// Scraper settings handed explicitly to every stage that needs them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub jurisdiction: String,
    /// When set and no term is requested, only the most recent term is scraped.
    pub latest_only: bool,
    pub base_url: String,
    pub db_path: String,
    pub concurrency: usize,
    pub terms: Vec<TermMeta>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        let terms = (2011..=2025)
            .step_by(2)
            .map(|start| TermMeta {
                name: format!("{}-{}", start, start + 1),
                start_year: start,
                end_year: start + 1,
            })
            .collect();
        ScraperConfig {
            jurisdiction: "ar".to_string(),
            latest_only: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
            concurrency: 8,
            terms,
        }
    }
}

impl ScraperConfig {
    /// Defaults, optionally overlaid by a JSON file, then by `ARLEG_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.display().to_string(),
                    source,
                })?;
                Self::from_json(&text).map_err(|source| ConfigError::Parse {
                    path: p.display().to_string(),
                    source,
                })?
            }
            None => Self::default(),
        };
        if let Ok(db) = std::env::var("ARLEG_DB_PATH") {
            config.db_path = db;
        }
        if let Ok(base) = std::env::var("ARLEG_BASE_URL") {
            config.base_url = base;
        }
        config.concurrency = config.concurrency.max(1);
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn term(&self, name: &str) -> Result<&TermMeta, ConfigError> {
        self.terms
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::NoDataForPeriod(name.to_string()))
    }

    pub fn latest_term(&self) -> Option<&TermMeta> {
        self.terms.iter().max_by_key(|t| t.start_year)
    }

    /// Term covering `year`, if any.
    pub fn term_for_year(&self, year: i32) -> Option<&TermMeta> {
        self.terms
            .iter()
            .find(|t| t.start_year <= year && year <= t.end_year)
    }

    /// Terms a scrape run covers when no term is given on the command line.
    pub fn default_terms(&self) -> Vec<&TermMeta> {
        if self.latest_only {
            self.latest_term().into_iter().collect()
        } else {
            self.terms.iter().collect()
        }
    }

    /// Search-results page for a term. The chamber filter stays empty; the
    /// page lists both chambers.
    pub fn roster_url(&self, term: &str) -> Result<Url, ConfigError> {
        let meta = self.term(term)?;
        let path = ROSTER_PATH.replace("{year}", &meta.start_year.to_string());
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|b| b.join(&path))
            .map_err(|source| ConfigError::BadUrl {
                url: self.base_url.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_url_uses_start_year() {
        let config = ScraperConfig::default();
        let url = config.roster_url("2013-2014").unwrap();
        assert_eq!(
            url.as_str(),
            "http://www.arkleg.state.ar.us/assembly/2013/2013R/Pages/LegislatorSearchResults.aspx?member=&committee=All&chamber="
        );
    }

    #[test]
    fn unknown_term() {
        let config = ScraperConfig::default();
        assert!(matches!(
            config.roster_url("1999-2000"),
            Err(ConfigError::NoDataForPeriod(t)) if t == "1999-2000"
        ));
    }

    #[test]
    fn latest_term_by_start_year() {
        let config = ScraperConfig::default();
        assert_eq!(config.latest_term().unwrap().name, "2025-2026");
        assert_eq!(config.default_terms().len(), 1);
    }

    #[test]
    fn all_terms_when_not_latest_only() {
        let config = ScraperConfig {
            latest_only: false,
            ..Default::default()
        };
        assert_eq!(config.default_terms().len(), config.terms.len());
    }

    #[test]
    fn term_for_year() {
        let config = ScraperConfig::default();
        assert_eq!(config.term_for_year(2014).unwrap().name, "2013-2014");
        assert!(config.term_for_year(1990).is_none());
    }

    #[test]
    fn json_overrides_defaults() {
        let json = r#"{
            "latest_only": false,
            "base_url": "https://arkleg.state.ar.us/",
            "terms": [{ "name": "2017-2018", "start_year": 2017, "end_year": 2018 }]
        }"#;
        let config = ScraperConfig::from_json(json).unwrap();
        assert_eq!(config.jurisdiction, "ar");
        assert_eq!(config.terms.len(), 1);
        let url = config.roster_url("2017-2018").unwrap();
        assert!(url.as_str().starts_with("https://arkleg.state.ar.us/assembly/2017/2017R/"));
    }
}
