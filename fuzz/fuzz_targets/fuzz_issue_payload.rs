#![no_main]

//! Fuzz target for issue payloads and their rendering.
//!
//! Titles, assignees and permalinks come straight from the server and can
//! hold any Unicode; rendering must never panic on them.

use std::convert::Infallible;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::json;

use curtis::models::{Issue, IssueRecord, Organization, Project};
use curtis::output::{shaped_issue, tree_shaped};

#[derive(Arbitrary, Debug)]
struct PayloadInput {
    raw: String,
    title: String,
    username: Option<String>,
    level: String,
    project: String,
    num_issues: u8,
}

fuzz_target!(|input: PayloadInput| {
    // Arbitrary bytes must not crash the decoder.
    let _ = serde_json::from_str::<IssueRecord>(&input.raw);

    let Ok(organization) = serde_json::from_value::<Organization>(json!({"slug": "acme"})) else {
        return;
    };
    let Ok(project) = serde_json::from_value::<Project>(json!({"slug": input.project})) else {
        return;
    };
    let (organization, project) = (Rc::new(organization), Rc::new(project));

    let mut issues = Vec::new();
    for i in 0..(input.num_issues % 20).max(1) {
        let payload = json!({
            "id": i.to_string(),
            "title": input.title,
            "level": input.level,
            "assignedTo": input.username.as_ref().map(|name| json!({"username": name})),
            "permalink": format!("https://sentry.example.com/issues/{}/", i),
        });
        let Ok(record) = serde_json::from_value::<IssueRecord>(payload) else {
            return;
        };
        let issue = Issue::new(Rc::clone(&organization), Rc::clone(&project), record);
        let _ = shaped_issue(&issue);
        issues.push(issue);
    }

    let count = issues.len();
    let lines: Vec<_> = tree_shaped("https://sentry.example.com", issues.into_iter().map(Ok::<_, Infallible>))
        .filter_map(Result::ok)
        .collect();
    assert_eq!(lines.iter().filter(|line| line.issue.is_some()).count(), count);
});
