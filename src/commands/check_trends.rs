use std::io::Write;

use anyhow::Result;

use super::UNRESOLVED_UNASSIGNED;
use crate::client::{Client, IssueQuery};
use crate::filters::{filter_title, max_age, seen, TitleFilter};
use crate::output::{shaped_trend, tree_shaped};
use crate::transport::Transport;
use crate::trends::{compute_trend, decode_period, TrendLevel};

/// Reports reviewed issues whose event rate grew over `period`.
pub fn run<T: Transport>(
    client: &Client<T>,
    out: &mut impl Write,
    period: &str,
    threshold: f64,
    filter: TitleFilter,
) -> Result<()> {
    let period = decode_period(period)?;

    let query = IssueQuery::search(UNRESOLVED_UNASSIGNED).with_stats_period(period.stats_period);
    let issues = client.iterate_issues(query);
    let issues = max_age(seen(issues), i64::from(period.days), i64::from(period.hours));
    let issues = filter_title(issues, filter);

    for line in tree_shaped(client.site_url(), issues) {
        let line = line?;
        let Some(issue) = &line.issue else {
            writeln!(out, "{}", line.text)?;
            continue;
        };

        let trend = compute_trend(period.stats_period, period.length(), threshold, issue);
        if trend.level < TrendLevel::Warn {
            continue;
        }
        writeln!(out, "{}\n    {}", line.text, shaped_trend(&trend))?;
    }
    Ok(())
}
