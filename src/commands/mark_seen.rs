use std::io::Write;

use anyhow::Result;

use super::{apply_to_each, UNRESOLVED_UNASSIGNED};
use crate::client::{Client, IssueQuery};
use crate::filters::{outdated, unseen};
use crate::transport::Transport;

/// Marks unseen issues last seen at least `age` days ago as seen.
pub fn run<T: Transport>(client: &Client<T>, out: &mut impl Write, age: i64) -> Result<()> {
    let issues = client.iterate_issues(IssueQuery::search(UNRESOLVED_UNASSIGNED));
    let issues = unseen(outdated(issues, age));
    apply_to_each(client, out, issues, |issue| client.mark_as_seen(issue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, days_ago, plain, projects, rendered, status, MockTransport};
    use crate::transport::Method;
    use serde_json::json;

    // ==================== Unit Tests ====================

    #[test]
    fn test_marks_old_unseen_issues() {
        plain();
        let mock = MockTransport::new();
        projects(
            &mock,
            &[(
                "backend",
                json!([
                    {"id": "1", "title": "Old", "hasSeen": false, "lastSeen": days_ago(10)},
                    {"id": "2", "title": "Recent", "hasSeen": false, "lastSeen": days_ago(1)},
                    {"id": "3", "title": "Reviewed", "hasSeen": true, "lastSeen": days_ago(10)},
                ]),
            )],
        );
        mock.on(Method::Put, "issues/1/", status(200));
        let client = testing::client(&mock);

        let mut out = Vec::new();
        run(&client, &mut out, 7).unwrap();
        let text = rendered(out);

        assert!(text.contains("Old"));
        assert!(!text.contains("Recent"));
        assert!(!text.contains("Reviewed"));
        assert!(!text.contains("ERROR"));

        let puts = mock.requests_to(Method::Put, "issues/1/");
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].body, Some(json!({"hasSeen": true})));
        assert!(mock.requests_to(Method::Put, "issues/2/").is_empty());
        assert!(mock.requests_to(Method::Put, "issues/3/").is_empty());
    }

    #[test]
    fn test_failure_annotates_and_continues() {
        plain();
        let mock = MockTransport::new();
        projects(
            &mock,
            &[(
                "backend",
                json!([
                    {"id": "1", "title": "First", "lastSeen": days_ago(10)},
                    {"id": "2", "title": "Second", "lastSeen": days_ago(10)},
                ]),
            )],
        );
        mock.fail(Method::Put, "issues/1/")
            .on(Method::Put, "issues/2/", status(200));
        let client = testing::client(&mock);

        let mut out = Vec::new();
        run(&client, &mut out, 7).unwrap();
        let text = rendered(out);

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].contains("First"));
        assert!(lines[1].contains(" --> ERROR, "));
        assert!(lines[1].contains("connection refused"));
        assert!(lines[2].contains("Second"));
        assert!(!lines[2].contains("ERROR"));
        assert_eq!(mock.requests_to(Method::Put, "issues/2/").len(), 1);
    }
}
