use colored::{Color, Colorize};

use crate::models::{Issue, Level, Project};
use crate::trends::{Trend, TrendLevel};

fn level_color(level: Level) -> Color {
    match level {
        Level::Fatal | Level::Error => Color::Red,
        Level::Warning => Color::Yellow,
        Level::Info => Color::Blue,
        Level::Debug => Color::BrightBlack,
        Level::Unknown => Color::White,
    }
}

pub fn shaped_project(site_url: &str, organization: &str, project: &Project) -> String {
    format!(
        "{} {}",
        project.slug.cyan().bold(),
        format!("[{}/{}/{}/]", site_url, organization, project.slug).cyan()
    )
}

pub fn shaped_issue(issue: &Issue) -> String {
    let color = level_color(issue.record.level);
    let last_seen = issue
        .record
        .last_seen
        .map(|at| at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{} {} {}",
        issue.title().color(color).bold(),
        issue.assignee().white(),
        format!("{} [{}]", last_seen, issue.record.permalink).color(color)
    )
}

pub fn shaped_trend(trend: &Trend) -> String {
    let headline = match trend.ratio {
        None => "New in period".magenta(),
        Some(ratio) if trend.level == TrendLevel::Alert => {
            format!("Ratio {:.1}", ratio).red()
        }
        Some(ratio) => format!("Ratio {:.1}", ratio).yellow(),
    };
    format!(
        "{} {}",
        headline,
        format!("({} new occurrence(s))", trend.current_count)
            .white()
            .bold()
    )
}

/// A printable line; issue lines carry the issue they describe.
#[derive(Debug, Clone)]
pub struct TreeLine {
    pub text: String,
    pub issue: Option<Issue>,
}

impl TreeLine {
    pub fn annotate(&mut self, note: &str) {
        self.text = format!("{} --> {}", self.text, note);
    }
}

/// Groups a stream of issues under a header line per project.
pub fn tree_shaped<I, E>(site_url: &str, issues: I) -> TreeShaped<I>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    TreeShaped {
        site_url: site_url.to_string(),
        issues,
        current: None,
        pending: None,
    }
}

pub struct TreeShaped<I> {
    site_url: String,
    issues: I,
    current: Option<Issue>,
    pending: Option<TreeLine>,
}

impl<I, E> Iterator for TreeShaped<I>
where
    I: Iterator<Item = Result<Issue, E>>,
{
    type Item = Result<TreeLine, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.pending.take() {
            return Some(Ok(line));
        }

        let issue = match self.issues.next()? {
            Ok(issue) => issue,
            Err(e) => return Some(Err(e)),
        };
        let line = TreeLine {
            text: format!("  - {}", shaped_issue(&issue)),
            issue: Some(issue.clone()),
        };

        let new_project = self
            .current
            .as_ref()
            .map_or(true, |current| !current.same_project(&issue));
        if !new_project {
            return Some(Ok(line));
        }

        let header = TreeLine {
            text: format!(
                "- {}",
                shaped_project(&self.site_url, &issue.organization.slug, &issue.project)
            ),
            issue: None,
        };
        self.current = Some(issue);
        self.pending = Some(line);
        Some(Ok(header))
    }
}
