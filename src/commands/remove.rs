use std::io::Write;

use anyhow::Result;
use tracing::debug;

use super::{apply_to_each, UNRESOLVED_UNASSIGNED};
use crate::client::{Client, IssueQuery};
use crate::filters::outdated;
use crate::transport::Transport;

/// Deletes outdated issues. Commented issues are listed but kept.
pub fn run<T: Transport>(client: &Client<T>, out: &mut impl Write, age: i64) -> Result<()> {
    let issues = client.iterate_issues(IssueQuery::search(UNRESOLVED_UNASSIGNED));
    apply_to_each(client, out, outdated(issues, age), |issue| {
        if issue.record.num_comments > 0 {
            debug!(issue = issue.id(), "keeping commented issue");
            return Ok(());
        }
        client.delete_issue(issue)
    })
}
