//! Lazy filters over issue streams.
//!
//! Every filter takes and returns an iterator of `Result<Issue, E>`. Errors
//! travel through untouched so the consumer still sees them in order.

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

use crate::models::Issue;

fn keep<I, E, P>(issues: I, predicate: P) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
    P: Fn(&Issue) -> bool,
{
    issues.filter(move |item| match item {
        Ok(issue) => predicate(issue),
        Err(_) => true,
    })
}

/// The instant `days` and `hours` before now.
///
/// Negative amounts count as zero; ages past the representable range
/// saturate at the earliest representable date.
pub fn cutoff(days: i64, hours: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days.max(0))
        .zip(TimeDelta::try_hours(hours.max(0)))
        .and_then(|(days, hours)| days.checked_add(&hours))
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Issues last seen `days` ago or earlier.
pub fn outdated<I, E>(issues: I, days: i64) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    last_seen_until(issues, cutoff(days, 0))
}

/// Issues last seen within the past `days` and `hours`.
pub fn max_age<I, E>(issues: I, days: i64, hours: i64) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    last_seen_since(issues, cutoff(days, hours))
}

pub fn last_seen_until<I, E>(issues: I, boundary: DateTime<Utc>) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    keep(issues, move |issue| {
        issue.record.last_seen.is_some_and(|seen| seen <= boundary)
    })
}

pub fn last_seen_since<I, E>(issues: I, boundary: DateTime<Utc>) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    keep(issues, move |issue| {
        issue.record.last_seen.is_some_and(|seen| seen >= boundary)
    })
}

pub fn seen<I, E>(issues: I) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    keep(issues, |issue| issue.record.has_seen)
}

pub fn unseen<I, E>(issues: I) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    keep(issues, |issue| !issue.record.has_seen)
}

/// How several `--include` patterns combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IncludeMode {
    /// Each include pattern narrows the stream: titles must match all of them.
    #[default]
    All,
    /// Titles must match at least one include pattern.
    Any,
}

#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
    mode: IncludeMode,
}

impl TitleFilter {
    pub fn new<S: AsRef<str>>(
        includes: &[S],
        excludes: &[S],
        mode: IncludeMode,
    ) -> Result<Self, regex::Error> {
        Ok(TitleFilter {
            includes: compile(includes)?,
            excludes: compile(excludes)?,
            mode,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    pub fn matches(&self, title: &str) -> bool {
        if self.excludes.iter().any(|pattern| pattern.is_match(title)) {
            return false;
        }
        if self.includes.is_empty() {
            return true;
        }
        match self.mode {
            IncludeMode::All => self.includes.iter().all(|pattern| pattern.is_match(title)),
            IncludeMode::Any => self.includes.iter().any(|pattern| pattern.is_match(title)),
        }
    }
}

// `is_match` searches anywhere in the title, like an unanchored search.
fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p.as_ref())).collect()
}

pub fn filter_title<I, E>(issues: I, filter: TitleFilter) -> impl Iterator<Item = Result<Issue, E>>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    keep(issues, move |issue| filter.matches(issue.title()))
}
