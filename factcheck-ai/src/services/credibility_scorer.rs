//! Deterministic source credibility scoring
//!
//! Maps a URL (and optional publication date) to a 0-10 score and one of
//! four tiers. Pure and total: no I/O, no errors. Malformed URLs score as
//! unknown with an empty domain.
//!
//! # Scoring
//! - Base score from domain membership: Tier-1 list 10, Tier-2 list 7,
//!   Tier-3 list 4, government/education suffix 9, subdomain of a Tier-1
//!   domain 9, subdomain of a Tier-2 domain 7, anything else 2.
//! - Recency: published less than 180 days ago +1, more than 730 days ago -1.
//! - Final score is `base + recency` clamped to 0..=10; the tier comes from
//!   the base score alone.

use crate::models::{CredibilityTier, SourceScore};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Url;

const TIER_1_DOMAINS: &[&str] = &[
    "reuters.com",
    "apnews.com",
    "bbc.com",
    "bbc.co.uk",
    "nature.com",
    "sciencedirect.com",
    "who.int",
    "un.org",
    "nih.gov",
    "cdc.gov",
    "nasa.gov",
    "pubmed.ncbi.nlm.nih.gov",
    "nejm.org",
    "thelancet.com",
    "science.org",
];

const TIER_2_DOMAINS: &[&str] = &[
    "nytimes.com",
    "washingtonpost.com",
    "theguardian.com",
    "economist.com",
    "ft.com",
    "bloomberg.com",
    "cnbc.com",
    "wikipedia.org",
    "en.wikipedia.org",
    "britannica.com",
    "pbs.org",
    "npr.org",
    "aljazeera.com",
    "thehindu.com",
    "ndtv.com",
    "livemint.com",
    "techcrunch.com",
    "arstechnica.com",
    "wired.com",
    "snopes.com",
    "factcheck.org",
    "politifact.com",
];

const TIER_3_DOMAINS: &[&str] = &[
    "medium.com",
    "substack.com",
    "wordpress.com",
    "forbes.com",
    "businessinsider.com",
    "huffpost.com",
    "indiatimes.com",
    "timesofindia.indiatimes.com",
];

const GOV_EDU_SUFFIXES: &[&str] = &[".gov", ".edu", ".ac.uk", ".gov.in", ".nic.in"];

const TIER_1_SCORE: u8 = 10;
const TIER_2_SCORE: u8 = 7;
const TIER_3_SCORE: u8 = 4;
const GOV_EDU_SCORE: u8 = 9;
const TIER_1_SUBDOMAIN_SCORE: u8 = 9;
const UNKNOWN_SCORE: u8 = 2;

const RECENT_DAYS: i64 = 180;
const STALE_DAYS: i64 = 730;

/// Date-only formats, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%d %B %Y"];
/// Date-time formats, tried after the date-only ones
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S"];

/// Normalized host of a URL: lowercase, leading `www.` removed
///
/// Returns "" for anything without a parseable host.
pub fn normalize_domain(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return String::new();
    };
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

fn is_strict_subdomain(domain: &str, parent: &str) -> bool {
    domain.len() > parent.len() + 1
        && domain.ends_with(parent)
        && domain.as_bytes()[domain.len() - parent.len() - 1] == b'.'
}

/// Base (pre-recency) score for a normalized domain
pub fn domain_score(domain: &str) -> u8 {
    if domain.is_empty() {
        return UNKNOWN_SCORE;
    }
    if TIER_1_DOMAINS.contains(&domain) {
        return TIER_1_SCORE;
    }
    if TIER_2_DOMAINS.contains(&domain) {
        return TIER_2_SCORE;
    }
    if TIER_3_DOMAINS.contains(&domain) {
        return TIER_3_SCORE;
    }
    if GOV_EDU_SUFFIXES.iter().any(|suffix| domain.ends_with(suffix)) {
        return GOV_EDU_SCORE;
    }
    if TIER_1_DOMAINS.iter().any(|parent| is_strict_subdomain(domain, parent)) {
        return TIER_1_SUBDOMAIN_SCORE;
    }
    if TIER_2_DOMAINS.iter().any(|parent| is_strict_subdomain(domain, parent)) {
        return TIER_2_SCORE;
    }
    UNKNOWN_SCORE
}

/// Parse a publication date using the accepted formats
///
/// Only the first 19 characters are considered, so timestamps with
/// fractional seconds or offsets still match the date-time format.
pub fn parse_publication_date(date: &str) -> Option<NaiveDate> {
    let trimmed: String = date.trim().chars().take(19).collect();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Recency modifier relative to `today`: -1, 0 or +1
///
/// Ages are measured from the start of the publication day, so a source
/// published exactly `STALE_DAYS` ago is already stale.
pub fn recency_modifier(date: Option<&str>, today: NaiveDate) -> i8 {
    let Some(published) = date.and_then(parse_publication_date) else {
        return 0;
    };
    let age_days = (today - published).num_days();
    if age_days < RECENT_DAYS {
        1
    } else if age_days >= STALE_DAYS {
        -1
    } else {
        0
    }
}

/// Score a source as of `today`
pub fn score_source_at(url: &str, date: Option<&str>, today: NaiveDate) -> SourceScore {
    let domain = normalize_domain(url);
    let base_score = domain_score(&domain);
    let recency_modifier = recency_modifier(date, today);
    let score = (i16::from(base_score) + i16::from(recency_modifier)).clamp(0, 10) as u8;

    SourceScore {
        domain,
        score,
        base_score,
        tier: CredibilityTier::from_base_score(base_score),
        recency_modifier,
    }
}

/// Score a source as of the current UTC date
pub fn score_source(url: &str, date: Option<&str>) -> SourceScore {
    score_source_at(url, date, Utc::now().date_naive())
}
