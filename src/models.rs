use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fatal,
    #[default]
    Error,
    Warning,
    Info,
    Debug,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Assignee {
    /// Newer servers drop `username` in favour of `name`.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueMetadata {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Servers send `null` for some fields they would otherwise omit.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One `(timestamp, count)` bucket of an issue's event histogram.
pub type StatsBucket = (i64, u64);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    pub id: String,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_seen: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub level: Level,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Assignee>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub culprit: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: IssueMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: HashMap<String, Vec<StatsBucket>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_comments: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permalink: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An issue together with the organization and project it was listed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub organization: Rc<Organization>,
    pub project: Rc<Project>,
    pub record: IssueRecord,
}

impl Issue {
    pub fn new(organization: Rc<Organization>, project: Rc<Project>, record: IssueRecord) -> Self {
        Issue {
            organization,
            project,
            record,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn assignee(&self) -> &str {
        self.record
            .assigned_to
            .as_ref()
            .map(Assignee::display_name)
            .unwrap_or("")
    }

    /// Fields the server sent that have no typed counterpart.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.record.extra.get(key)
    }

    pub fn stats(&self, period: &str) -> &[StatsBucket] {
        self.record
            .stats
            .get(period)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn same_project(&self, other: &Issue) -> bool {
        self.organization.slug == other.organization.slug && self.project.slug == other.project.slug
    }
}
