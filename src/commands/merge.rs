use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use tracing::warn;

use crate::client::{Client, IssueQuery};
use crate::models::Issue;
use crate::output::tree_shaped;
use crate::transport::Transport;

/// Issues sharing a key are considered the same problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MergeKey {
    project: String,
    kind: Option<String>,
    value: Option<String>,
    title: Option<String>,
    culprit: String,
}

impl MergeKey {
    fn of(issue: &Issue) -> Self {
        let metadata = &issue.record.metadata;
        MergeKey {
            project: issue.project.slug.clone(),
            kind: metadata.kind.clone(),
            value: metadata.value.clone(),
            title: metadata.title.clone(),
            culprit: issue.record.culprit.clone(),
        }
    }
}

/// Groups issues by key, groups in first-seen order.
fn group(issues: impl IntoIterator<Item = Issue>) -> Vec<Vec<Issue>> {
    let mut groups: Vec<Vec<Issue>> = Vec::new();
    let mut positions: HashMap<MergeKey, usize> = HashMap::new();
    for issue in issues {
        let position = *positions.entry(MergeKey::of(&issue)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[position].push(issue);
    }
    groups
}

pub fn run<T: Transport>(client: &Client<T>, out: &mut impl Write) -> Result<()> {
    let mut collected = Vec::new();
    for line in tree_shaped(client.site_url(), client.iterate_issues(IssueQuery::all())) {
        let line = line?;
        writeln!(out, "{}", line.text)?;
        collected.extend(line.issue);
    }

    for issues in group(collected) {
        if issues.len() <= 1 {
            continue;
        }
        let ids: Vec<&str> = issues.iter().map(Issue::id).collect();
        writeln!(
            out,
            "{} :: merging issues: [{}]",
            issues[0].project.slug,
            ids.join(", ")
        )?;
        if let Err(e) = client.merge_issues(&issues) {
            warn!(error = %e, "merge failed");
            writeln!(out, "ERROR, {}", e)?;
        }
    }
    Ok(())
}
