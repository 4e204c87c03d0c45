use std::io::{self, Write};

use anyhow::Result;
use itertools::Itertools;
use tracing::warn;

use super::UNRESOLVED_UNASSIGNED;
use crate::client::{Client, IssueQuery};
use crate::config::BROWSE_BATCH_SIZE;
use crate::filters::{filter_title, max_age, unseen, TitleFilter};
use crate::output::tree_shaped;
use crate::prompt::{Answer, Prompt};
use crate::transport::Transport;

const SEPARATOR_WIDTH: usize = 120;

/// Pages through recent unseen issues, offering to open each batch.
pub fn run<T, P, O>(
    client: &Client<T>,
    out: &mut impl Write,
    prompt: &mut P,
    mut open: O,
    age: i64,
    filter: TitleFilter,
) -> Result<()>
where
    T: Transport,
    P: Prompt,
    O: FnMut(&str) -> io::Result<()>,
{
    let issues = client.iterate_issues(IssueQuery::search(UNRESOLVED_UNASSIGNED));
    let issues = filter_title(unseen(max_age(issues, age, 0)), filter);
    let batches = tree_shaped(client.site_url(), issues).chunks(BROWSE_BATCH_SIZE);

    for batch in &batches {
        writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        let mut permalinks = Vec::new();
        for line in batch {
            let line = line?;
            writeln!(out, "{}", line.text)?;
            if let Some(issue) = line.issue {
                permalinks.push(issue.record.permalink);
            }
        }
        out.flush()?;

        if permalinks.is_empty() {
            continue;
        }
        let message = format!(
            "Opening {} preceding unseen issues in browser? [y/N | ^C to quit] ",
            permalinks.len()
        );
        match prompt.confirm(&message, "yn", 'n')? {
            Answer::Interrupted => return Ok(()),
            answer if answer.is('y') => {
                for permalink in &permalinks {
                    if let Err(e) = open(permalink) {
                        warn!(permalink = %permalink, error = %e, "could not open browser");
                        writeln!(out, "ERROR, {}", e)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}
