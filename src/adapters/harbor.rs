//! Harbor v2 registry API adapter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{at, http_error, json_body, AdapterError};
use crate::config::HarborConfig;
use crate::envelope::Envelope;
use crate::registry::BuildContext;
use crate::tool::{bind, NoParams, OperationSpec, Toolset};

pub const LIST_HARBOR_PROJECTS: OperationSpec =
    OperationSpec::read("list_harbor_projects", "List all project names in Harbor.");
pub const LIST_HARBOR_REPOSITORIES: OperationSpec = OperationSpec::read(
    "list_harbor_repositories",
    "List the image repositories inside a Harbor project.",
);
pub const LIST_IMAGE_TAGS: OperationSpec = OperationSpec::read(
    "list_image_tags",
    "List the tags of an image repository in a Harbor project.",
);
pub const GET_VULNERABILITY_REPORT: OperationSpec = OperationSpec::read(
    "get_vulnerability_report",
    "Summarise the vulnerability scan of an image tag (total, critical, high, medium, low).",
);
pub const SCAN_IMAGE: OperationSpec = OperationSpec::mutating(
    "scan_image",
    "Start a vulnerability scan of an image tag. Results arrive later via get_vulnerability_report.",
);

const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectParams {
    #[schemars(description = "Harbor project name")]
    pub project_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RepositoryParams {
    #[schemars(description = "Harbor project name")]
    pub project_name: String,
    #[schemars(description = "Repository name inside the project, without the project prefix")]
    pub repository_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ArtifactParams {
    #[schemars(description = "Harbor project name")]
    pub project_name: String,
    #[schemars(description = "Repository name inside the project, without the project prefix")]
    pub repository_name: String,
    #[schemars(description = "Image tag, e.g. 'latest'")]
    pub tag: String,
}

pub struct HarborAdapter {
    client: Client,
    base: String,
    username: Option<String>,
    token: Option<String>,
}

/// Harbor expects nested repository names with `/` double-encoded.
fn encode_repository(name: &str) -> String {
    name.trim_matches('/').replace('/', "%252F")
}

fn require(field: &str, value: &str) -> Result<(), AdapterError> {
    if value.trim().is_empty() || value.contains(char::is_whitespace) {
        return Err(AdapterError::invalid(format!(
            "{field} must be a non-empty name without spaces"
        )));
    }
    Ok(())
}

impl HarborAdapter {
    pub fn new(config: &HarborConfig) -> anyhow::Result<Self> {
        let base = config
            .url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .context("harbor.url is not set")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base: base.to_string(),
            username: config.username.clone(),
            token: config.token.clone(),
        })
    }

    async fn request(&self, method: Method, endpoint: &str) -> Result<Value, AdapterError> {
        let url = format!("{}/api/v2.0{endpoint}", self.base);
        tracing::debug!(%method, %url, "harbor request");

        let mut request = self.client.request(method, &url);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.token.as_deref());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        json_body(response).await
    }

    fn artifact_path(project: &str, repository: &str) -> String {
        format!(
            "/projects/{project}/repositories/{}/artifacts",
            encode_repository(repository)
        )
    }

    pub async fn list_projects(&self) -> Result<Envelope, AdapterError> {
        let data = self
            .request(Method::GET, &format!("/projects?page_size={PAGE_SIZE}"))
            .await?;
        Ok(Envelope::records(
            names(&data).map(|n| Value::String(n.to_string())).collect(),
        ))
    }

    pub async fn list_repositories(&self, project: &str) -> Result<Envelope, AdapterError> {
        require("project_name", project)?;
        let data = self
            .request(
                Method::GET,
                &format!("/projects/{project}/repositories?page_size={PAGE_SIZE}"),
            )
            .await?;
        let prefix = format!("{project}/");
        Ok(Envelope::records(
            names(&data)
                .map(|n| Value::String(n.strip_prefix(&prefix).unwrap_or(n).to_string()))
                .collect(),
        ))
    }

    pub async fn list_tags(&self, project: &str, repository: &str) -> Result<Envelope, AdapterError> {
        require("project_name", project)?;
        require("repository_name", repository)?;
        let endpoint = format!(
            "{}?with_tag=true&page_size={PAGE_SIZE}",
            Self::artifact_path(project, repository)
        );
        let data = self.request(Method::GET, &endpoint).await?;

        let tags = data
            .as_array()
            .into_iter()
            .flatten()
            .flat_map(|artifact| artifact["tags"].as_array().into_iter().flatten())
            .filter_map(|tag| tag["name"].as_str())
            .map(|name| Value::String(name.to_string()))
            .collect();
        Ok(Envelope::records(tags))
    }

    pub async fn vulnerability_report(
        &self,
        project: &str,
        repository: &str,
        tag: &str,
    ) -> Result<Envelope, AdapterError> {
        require("project_name", project)?;
        require("repository_name", repository)?;
        require("tag", tag)?;
        let endpoint = format!(
            "{}/{tag}?with_scan_overview=true",
            Self::artifact_path(project, repository)
        );
        let data = self.request(Method::GET, &endpoint).await?;
        Ok(Envelope::record(summarize_scan(
            &data,
            &format!("{project}/{repository}:{tag}"),
        )))
    }

    pub async fn scan(&self, project: &str, repository: &str, tag: &str) -> Result<Envelope, AdapterError> {
        require("project_name", project)?;
        require("repository_name", repository)?;
        require("tag", tag)?;
        let endpoint = format!("{}/{tag}/scan", Self::artifact_path(project, repository));
        self.request(Method::POST, &endpoint).await?;
        Ok(Envelope::success(format!(
            "Vulnerability scan requested for {project}/{repository}:{tag}. Check get_vulnerability_report for results."
        )))
    }
}

fn names(data: &Value) -> impl Iterator<Item = &str> {
    data.as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item["name"].as_str())
}

/// Reduce an artifact's `scan_overview` to a severity summary.
fn summarize_scan(artifact: &Value, image: &str) -> Value {
    let report = artifact["scan_overview"]
        .as_object()
        .and_then(|overview| overview.values().next());

    let Some(report) = report else {
        return json!({
            "scan_status": "Not Scanned",
            "image": image,
            "message": format!("No vulnerability scan found for {image}."),
        });
    };

    let state = report["scan_status"].as_str().unwrap_or("Unknown");
    if matches!(state, "Pending" | "Running" | "Scheduled") {
        return json!({
            "scan_status": "Scanning",
            "image": image,
            "message": format!("The scan of {image} is still {}.", state.to_lowercase()),
        });
    }

    let summary = &report["summary"];
    let total = at(summary, "/total").as_u64().unwrap_or(0);
    if total == 0 {
        return json!({
            "scan_status": "Clean",
            "image": image,
            "total_vulnerabilities": 0,
            "message": format!("No vulnerabilities found for {image}."),
        });
    }

    let severity = |name: &str| {
        at(summary, &format!("/summary/{name}"))
            .as_u64()
            .unwrap_or(0)
    };
    json!({
        "scan_status": "Vulnerabilities Found",
        "image": image,
        "vulnerability_summary": {
            "total": total,
            "critical": severity("Critical"),
            "high": severity("High"),
            "medium": severity("Medium"),
            "low": severity("Low"),
        },
    })
}

pub fn toolset(ctx: &BuildContext) -> anyhow::Result<Toolset> {
    let adapter = Arc::new(HarborAdapter::new(&ctx.config.harbor)?);
    Ok(vec![
        bind(&adapter, LIST_HARBOR_PROJECTS, |a, _: NoParams| async move {
            a.list_projects().await
        }),
        bind(&adapter, LIST_HARBOR_REPOSITORIES, |a, p: ProjectParams| async move {
            a.list_repositories(&p.project_name).await
        }),
        bind(&adapter, LIST_IMAGE_TAGS, |a, p: RepositoryParams| async move {
            a.list_tags(&p.project_name, &p.repository_name).await
        }),
        bind(&adapter, GET_VULNERABILITY_REPORT, |a, p: ArtifactParams| async move {
            a.vulnerability_report(&p.project_name, &p.repository_name, &p.tag)
                .await
        }),
        bind(&adapter, SCAN_IMAGE, |a, p: ArtifactParams| async move {
            a.scan(&p.project_name, &p.repository_name, &p.tag).await
        }),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_repositories_are_double_encoded() {
        assert_eq!(encode_repository("nginx"), "nginx");
        assert_eq!(encode_repository("tools/ci/runner"), "tools%252Fci%252Frunner");
    }

    #[test]
    fn missing_url_fails_construction() {
        let err = HarborAdapter::new(&HarborConfig::default()).err().unwrap();
        assert!(err.to_string().contains("harbor.url"));
    }

    #[test]
    fn unscanned_artifact() {
        let summary = summarize_scan(&json!({"digest": "sha256:abc"}), "lab/web:1.0");
        assert_eq!(summary["scan_status"], "Not Scanned");
    }

    #[test]
    fn clean_artifact() {
        let artifact = json!({"scan_overview": {
            "application/vnd.security.vulnerability.report; version=1.1": {
                "scan_status": "Success",
                "summary": {"total": 0}
            }
        }});
        assert_eq!(summarize_scan(&artifact, "lab/web:1.0")["scan_status"], "Clean");
    }

    #[test]
    fn severity_counts_are_extracted() {
        let artifact = json!({"scan_overview": {
            "application/vnd.security.vulnerability.report; version=1.1": {
                "scan_status": "Success",
                "summary": {"total": 7, "fixable": 4, "summary": {"Critical": 1, "High": 2, "Low": 4}}
            }
        }});
        let summary = summarize_scan(&artifact, "lab/web:1.0");
        assert_eq!(summary["scan_status"], "Vulnerabilities Found");
        assert_eq!(summary["vulnerability_summary"]["total"], 7);
        assert_eq!(summary["vulnerability_summary"]["critical"], 1);
        assert_eq!(summary["vulnerability_summary"]["medium"], 0);
    }
}
