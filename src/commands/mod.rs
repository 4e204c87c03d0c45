pub mod assigned;
pub mod browse;
pub mod check_trends;
pub mod mark_seen;
pub mod merge;
pub mod remove;
pub mod resolve;
pub mod triage;

use std::io::Write;

use anyhow::Result;

use crate::client::{Client, IssueQuery};
use crate::error::ClientError;
use crate::models::Issue;
use crate::output::tree_shaped;
use crate::transport::Transport;

pub const UNRESOLVED_ASSIGNED: &str = "is:unresolved is:assigned";
pub const UNRESOLVED_UNASSIGNED: &str = "is:unresolved is:unassigned";

/// Prints the tree of every issue matching `query`.
pub(crate) fn print_tree<T: Transport>(
    client: &Client<T>,
    out: &mut impl Write,
    query: &str,
) -> Result<()> {
    let issues = client.iterate_issues(IssueQuery::search(query));
    for line in tree_shaped(client.site_url(), issues) {
        writeln!(out, "{}", line?.text)?;
    }
    Ok(())
}

/// Prints the tree of `issues`, applying `action` to each one on the way.
///
/// A failed action is reported on the issue's own line and the run goes on.
pub(crate) fn apply_to_each<T, I, F>(
    client: &Client<T>,
    out: &mut impl Write,
    issues: I,
    mut action: F,
) -> Result<()>
where
    T: Transport,
    I: Iterator<Item = Result<Issue, ClientError>>,
    F: FnMut(&Issue) -> Result<(), ClientError>,
{
    for line in tree_shaped(client.site_url(), issues) {
        let mut line = line?;
        if let Some(issue) = &line.issue {
            if let Err(e) = action(issue) {
                tracing::warn!(issue = issue.id(), error = %e, "action failed");
                line.annotate(&format!("ERROR, {}", e));
            }
        }
        writeln!(out, "{}", line.text)?;
    }
    Ok(())
}
