use std::collections::HashSet;
use std::rc::Rc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::models::{Issue, IssueRecord, Organization, Project};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::trends::StatsPeriod;

pub const API_ROOT: &str = "/api/0/";

type Params = Vec<(String, String)>;

/// Filters sent along with every issue listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueQuery {
    pub query: Option<String>,
    pub stats_period: Option<StatsPeriod>,
}

impl IssueQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(query: &str) -> Self {
        IssueQuery {
            query: Some(query.to_string()),
            stats_period: None,
        }
    }

    pub fn with_stats_period(mut self, period: StatsPeriod) -> Self {
        self.stats_period = Some(period);
        self
    }

    fn params(&self) -> Params {
        let mut params = Vec::new();
        if let Some(query) = &self.query {
            params.push(("query".to_string(), query.clone()));
        }
        if let Some(period) = self.stats_period {
            params.push(("statsPeriod".to_string(), period.as_str().to_string()));
        }
        params
    }
}

#[derive(Debug)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub next: Option<String>,
}

pub struct Client<T> {
    transport: T,
    site_url: String,
    api_url: Url,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, site_url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: site_url.to_string(),
            reason,
        };
        let api_url = Url::parse(site_url)
            .and_then(|url| url.join(API_ROOT))
            .map_err(|e| invalid(e.to_string()))?;
        if api_url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        Ok(Client {
            transport,
            site_url: site_url.trim_end_matches('/').to_string(),
            api_url,
        })
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Resolves a path against the API root; absolute URLs pass through.
    pub fn full_url(&self, path_or_url: &str) -> Result<String, ClientError> {
        if path_or_url.starts_with("http") {
            return Ok(path_or_url.to_string());
        }
        self.api_url
            .join(path_or_url)
            .map(String::from)
            .map_err(|e| ClientError::InvalidUrl {
                url: path_or_url.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn fetch_page<R: DeserializeOwned>(
        &self,
        path_or_url: &str,
        params: &[(String, String)],
    ) -> Result<Page<R>, ClientError> {
        let url = self.full_url(path_or_url)?;
        let response = self
            .transport
            .send(ApiRequest::new(Method::Get, &url).query(params))?;

        if !response.is_success() {
            return Err(ClientError::Status {
                url,
                status: response.status,
            });
        }

        let next = response.next_page();
        let items = if response.body.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&response.body)
                .map_err(|source| ClientError::Payload { url: url.clone(), source })?
        };

        debug!(url = %url, items = items.len(), has_next = next.is_some(), "fetched page");
        Ok(Page { items, next })
    }

    /// Lazily walks every page of a listing endpoint.
    pub fn pages<R: DeserializeOwned>(&self, path_or_url: &str, params: Params) -> Pages<'_, T, R> {
        Pages {
            client: self,
            next: Some(path_or_url.to_string()),
            params,
            buffer: Vec::new().into_iter(),
            exhausted: false,
        }
    }

    pub fn organizations(&self) -> Pages<'_, T, Organization> {
        self.pages("organizations/", Vec::new())
    }

    pub fn projects(&self, organization: &Organization) -> Pages<'_, T, Project> {
        self.pages(
            &format!("organizations/{}/projects/", organization.slug),
            Vec::new(),
        )
    }

    pub fn project_issues(
        &self,
        organization: Rc<Organization>,
        project: Rc<Project>,
        query: &IssueQuery,
    ) -> ProjectIssues<'_, T> {
        let path = format!("projects/{}/{}/issues/", organization.slug, project.slug);
        ProjectIssues {
            pages: self.pages(&path, query.params()),
            organization,
            project,
            seen: HashSet::new(),
        }
    }

    /// Every issue of every project of every organization, fetched on demand.
    pub fn iterate_issues(&self, query: IssueQuery) -> IssueIter<'_, T> {
        IssueIter {
            client: self,
            query,
            organizations: self.organizations(),
            projects: None,
            issues: None,
            failed: false,
        }
    }

    pub fn mark_as_seen(&self, issue: &Issue) -> Result<(), ClientError> {
        info!(issue = issue.id(), "marking issue as seen");
        self.put(&issue_path(issue), json!({"hasSeen": true}), &[])?;
        Ok(())
    }

    pub fn resolve_issue(&self, issue: &Issue) -> Result<(), ClientError> {
        info!(issue = issue.id(), "resolving issue");
        self.put(&issue_path(issue), json!({"status": "resolved"}), &[])?;
        Ok(())
    }

    pub fn delete_issue(&self, issue: &Issue) -> Result<(), ClientError> {
        info!(issue = issue.id(), "deleting issue");
        self.delete(&issue_path(issue))?;
        Ok(())
    }

    /// Merges `issues` into one, within the project of the first issue.
    pub fn merge_issues(&self, issues: &[Issue]) -> Result<(), ClientError> {
        let Some(first) = issues.first() else {
            return Ok(());
        };
        let path = format!(
            "projects/{}/{}/issues/",
            first.organization.slug, first.project.slug
        );
        let params: Params = issues
            .iter()
            .map(|issue| ("id".to_string(), issue.id().to_string()))
            .collect();

        info!(project = %first.project.slug, count = issues.len(), "merging issues");
        self.put(&path, json!({"merge": 1}), &params)?;
        Ok(())
    }

    fn put(&self, path: &str, body: Value, params: &[(String, String)]) -> Result<ApiResponse, ClientError> {
        let url = self.full_url(path)?;
        let first = self.transport.send(
            ApiRequest::new(Method::Put, &url)
                .query(params)
                .json(body.clone()),
        )?;

        let response = if first.status == 401 {
            warn!(url = %url, "update refused, retrying with CSRF token");
            self.retry_with_csrf(Method::Put, &url, Some(body), params, &first)?
        } else {
            first
        };
        ensure_success(url, response)
    }

    fn delete(&self, path: &str) -> Result<ApiResponse, ClientError> {
        let url = self.full_url(path)?;
        let first = self.transport.send(
            ApiRequest::new(Method::Delete, &url)
                .header("Content-Type", "application/json")
                .header("referer", url.as_str()),
        )?;

        // Any refusal triggers the second attempt here, not only a 401.
        let response = if !first.is_success() {
            warn!(url = %url, status = first.status, "delete refused, retrying with CSRF token");
            self.retry_with_csrf(Method::Delete, &url, None, &[], &first)?
        } else {
            first
        };
        ensure_success(url, response)
    }

    fn retry_with_csrf(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        params: &[(String, String)],
        refused: &ApiResponse,
    ) -> Result<ApiResponse, ClientError> {
        let token = refused
            .cookie("sc")
            .ok_or_else(|| ClientError::MissingCsrfToken {
                url: url.to_string(),
            })?;

        let mut request = ApiRequest::new(method, url)
            .query(params)
            .header("Content-Type", "application/json")
            .header("X-CSRFToken", token)
            .header("referer", url)
            .cookies(&refused.cookies);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.transport.send(request)
    }
}

fn issue_path(issue: &Issue) -> String {
    format!("issues/{}/", issue.id())
}

fn ensure_success(url: String, response: ApiResponse) -> Result<ApiResponse, ClientError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status {
            url,
            status: response.status,
        })
    }
}

pub struct Pages<'a, T, R> {
    client: &'a Client<T>,
    next: Option<String>,
    // Only the first request carries them: `next` links already embed the query.
    params: Params,
    buffer: std::vec::IntoIter<R>,
    exhausted: bool,
}

impl<T: Transport, R: DeserializeOwned> Iterator for Pages<'_, T, R> {
    type Item = Result<R, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            if self.exhausted {
                return None;
            }
            let url = self.next.take()?;
            let params = std::mem::take(&mut self.params);

            match self.client.fetch_page::<R>(&url, &params) {
                Ok(page) if page.items.is_empty() => {
                    self.exhausted = true;
                    return None;
                }
                Ok(page) => {
                    self.next = page.next;
                    self.buffer = page.items.into_iter();
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Issues of one project, each id emitted at most once.
pub struct ProjectIssues<'a, T> {
    pages: Pages<'a, T, IssueRecord>,
    organization: Rc<Organization>,
    project: Rc<Project>,
    seen: HashSet<String>,
}

impl<T: Transport> Iterator for ProjectIssues<'_, T> {
    type Item = Result<Issue, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.pages.next()? {
                Ok(record) => {
                    if self.seen.insert(record.id.clone()) {
                        return Some(Ok(Issue::new(
                            Rc::clone(&self.organization),
                            Rc::clone(&self.project),
                            record,
                        )));
                    }
                    debug!(issue = %record.id, project = %self.project.slug, "skipping duplicate issue");
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub struct IssueIter<'a, T> {
    client: &'a Client<T>,
    query: IssueQuery,
    organizations: Pages<'a, T, Organization>,
    projects: Option<(Rc<Organization>, Pages<'a, T, Project>)>,
    issues: Option<ProjectIssues<'a, T>>,
    failed: bool,
}

impl<'a, T: Transport> IssueIter<'a, T> {
    fn fail(&mut self, error: ClientError) -> Option<Result<Issue, ClientError>> {
        self.failed = true;
        Some(Err(error))
    }
}

impl<T: Transport> Iterator for IssueIter<'_, T> {
    type Item = Result<Issue, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }

            if let Some(issues) = self.issues.as_mut() {
                match issues.next() {
                    Some(Ok(issue)) => return Some(Ok(issue)),
                    Some(Err(e)) => return self.fail(e),
                    None => self.issues = None,
                }
            }

            if let Some((organization, projects)) = self.projects.as_mut() {
                match projects.next() {
                    Some(Ok(project)) => {
                        let organization = Rc::clone(organization);
                        self.issues = Some(self.client.project_issues(
                            organization,
                            Rc::new(project),
                            &self.query,
                        ));
                    }
                    Some(Err(e)) => return self.fail(e),
                    None => self.projects = None,
                }
                continue;
            }

            match self.organizations.next() {
                Some(Ok(organization)) => {
                    let projects = self.client.projects(&organization);
                    self.projects = Some((Rc::new(organization), projects));
                }
                Some(Err(e)) => return self.fail(e),
                None => return None,
            }
        }
    }
}
