//! Intent classification.
//!
//! Classification is a pure function of the input text and the site
//! directory. Rules are tried in a fixed order and the first rule that
//! produces an intent wins; anything unmatched is handed to the language
//! model as conversation.

use std::cmp::Reverse;

use url::Url;

use crate::config::ConfigError;
use crate::types::Utterance;

/// The classified meaning of an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Report the current wall-clock time
    Time,
    /// Open the given URL in the browser
    OpenSite(String),
    /// Hand the utterance to the language model
    Converse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SiteEntry {
    keyword: String,
    url: String,
}

/// Ordered keyword to URL table used by the "open" intent.
///
/// Lookup is substring containment. When several keywords occur in the text
/// the longest one wins, and keywords of equal length are ranked by the order
/// they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDirectory {
    entries: Vec<SiteEntry>,
}

impl SiteDirectory {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add or replace an entry. Keywords are normalized to lowercase and the
    /// URL must be an absolute http(s) URL.
    pub fn insert(&mut self, keyword: &str, url: &str) -> Result<(), ConfigError> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Err(ConfigError::InvalidSite {
                entry: format!("{}={}", keyword, url),
                reason: "keyword cannot be empty".to_string(),
            });
        }

        let url = url.trim();
        let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidSite {
            entry: format!("{}={}", keyword, url),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidSite {
                entry: format!("{}={}", keyword, url),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        match self.entries.iter_mut().find(|entry| entry.keyword == keyword) {
            Some(entry) => entry.url = url.to_string(),
            None => self.entries.push(SiteEntry {
                keyword,
                url: url.to_string(),
            }),
        }
        Ok(())
    }

    /// Find the URL for the best keyword contained in `text`
    pub fn lookup(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| text.contains(entry.keyword.as_str()))
            .max_by_key(|(index, entry)| (entry.keyword.len(), Reverse(*index)))
            .map(|(_, entry)| entry.url.as_str())
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.keyword.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SiteDirectory {
    fn default() -> Self {
        let mut directory = Self::empty();
        for (keyword, url) in [
            ("youtube", "https://www.youtube.com"),
            ("utube", "https://www.youtube.com"),
            ("google", "https://www.google.com"),
            ("gmail", "https://mail.google.com"),
            ("github", "https://github.com"),
            ("spotify", "https://open.spotify.com"),
        ] {
            directory.entries.push(SiteEntry {
                keyword: keyword.to_string(),
                url: url.to_string(),
            });
        }
        directory
    }
}

/// Classification rules in priority order
#[derive(Debug, Clone, Copy)]
enum Rule {
    Time,
    OpenSite,
}

const RULES: [Rule; 2] = [Rule::Time, Rule::OpenSite];

impl Rule {
    fn apply(self, text: &str, sites: &SiteDirectory) -> Option<Intent> {
        match self {
            Rule::Time => text.contains("time").then_some(Intent::Time),
            Rule::OpenSite => {
                if !text.contains("open") {
                    return None;
                }
                sites
                    .lookup(text)
                    .map(|url| Intent::OpenSite(url.to_string()))
            }
        }
    }
}

/// Maps utterances to intents
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    sites: SiteDirectory,
}

impl IntentClassifier {
    pub fn new(sites: SiteDirectory) -> Self {
        Self { sites }
    }

    pub fn sites(&self) -> &SiteDirectory {
        &self.sites
    }

    pub fn classify(&self, utterance: &Utterance) -> Intent {
        let text = utterance.text.to_lowercase();
        RULES
            .iter()
            .find_map(|rule| rule.apply(&text, &self.sites))
            .unwrap_or(Intent::Converse)
    }
}
