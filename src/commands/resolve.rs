use std::io::Write;

use anyhow::Result;

use super::{apply_to_each, UNRESOLVED_UNASSIGNED};
use crate::client::{Client, IssueQuery};
use crate::filters::outdated;
use crate::transport::Transport;

pub fn run<T: Transport>(client: &Client<T>, out: &mut impl Write, age: i64) -> Result<()> {
    let issues = client.iterate_issues(IssueQuery::search(UNRESOLVED_UNASSIGNED));
    apply_to_each(client, out, outdated(issues, age), |issue| {
        client.resolve_issue(issue)
    })
}
