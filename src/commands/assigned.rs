use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use colored::Colorize;

use super::{print_tree, UNRESOLVED_ASSIGNED};
use crate::client::{Client, IssueQuery};
use crate::models::Issue;
use crate::output::shaped_issue;
use crate::transport::Transport;

pub fn run<T: Transport>(client: &Client<T>, out: &mut impl Write) -> Result<()> {
    print_tree(client, out, UNRESOLVED_ASSIGNED)
}

/// Lists assigned issues under their assignee, assignees in first-seen order.
pub fn by_assignee<T: Transport>(client: &Client<T>, out: &mut impl Write) -> Result<()> {
    let mut groups: Vec<(String, Vec<Issue>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for issue in client.iterate_issues(IssueQuery::search(UNRESOLVED_ASSIGNED)) {
        let issue = issue?;
        write!(out, ".")?;
        out.flush()?;

        let assignee = issue.assignee().to_string();
        let position = *positions.entry(assignee.clone()).or_insert_with(|| {
            groups.push((assignee, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(issue);
    }
    writeln!(out)?;

    for (assignee, issues) in &groups {
        writeln!(out, "- {}", assignee.bold())?;
        for issue in issues {
            writeln!(out, "  - {}", shaped_issue(issue))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, plain, projects, rendered, MockTransport};
    use crate::transport::Method;
    use serde_json::json;

    fn assigned(id: &str, username: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("Issue {}", id),
            "assignedTo": {"username": username, "name": username.to_uppercase()},
        })
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_assigned_issues_tree() {
        plain();
        let mock = MockTransport::new();
        projects(&mock, &[("backend", json!([assigned("1", "alice")]))]);
        let client = testing::client(&mock);

        let mut out = Vec::new();
        run(&client, &mut out).unwrap();
        let text = rendered(out);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("- backend"));
        assert!(lines[1].starts_with("  - Issue 1 alice"));

        let request = &mock.requests_to(Method::Get, "projects/acme/backend/issues/")[0];
        assert!(request
            .query
            .contains(&("query".to_string(), "is:unresolved is:assigned".to_string())));
    }

    #[test]
    fn test_by_assignee_first_seen_order() {
        plain();
        let mock = MockTransport::new();
        projects(
            &mock,
            &[
                ("backend", json!([assigned("1", "bob"), assigned("2", "alice")])),
                ("frontend", json!([assigned("3", "bob")])),
            ],
        );
        let client = testing::client(&mock);

        let mut out = Vec::new();
        by_assignee(&client, &mut out).unwrap();
        let text = rendered(out);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "...");
        assert_eq!(lines[1], "- bob");
        assert!(lines[2].starts_with("  - Issue 1"));
        assert!(lines[3].starts_with("  - Issue 3"));
        assert_eq!(lines[4], "- alice");
        assert!(lines[5].starts_with("  - Issue 2"));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_by_assignee_nothing_assigned() {
        let mock = MockTransport::new();
        projects(&mock, &[("backend", json!([]))]);
        let client = testing::client(&mock);

        let mut out = Vec::new();
        by_assignee(&client, &mut out).unwrap();
        assert_eq!(rendered(out), "\n");
    }

    #[test]
    fn test_listing_failure_is_an_error() {
        let mock = MockTransport::new();
        mock.fail(Method::Get, "organizations/");
        let client = testing::client(&mock);

        let mut out = Vec::new();
        assert!(run(&client, &mut out).is_err());
    }
}
