//! Helm CLI adapter. Read commands use `-o json`.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{cli_arg, AdapterError, CommandRunner, CommandSpec};
use crate::config::HelmConfig;
use crate::envelope::Envelope;
use crate::registry::BuildContext;
use crate::tool::{bind, OperationSpec, Toolset};

pub const LIST_HELM_RELEASES: OperationSpec = OperationSpec::read(
    "list_helm_releases",
    "List Helm releases in a namespace.",
);
pub const GET_HELM_RELEASE_STATUS: OperationSpec = OperationSpec::read(
    "get_helm_release_status",
    "Show the status of a Helm release.",
);
pub const GET_HELM_RELEASE_HISTORY: OperationSpec = OperationSpec::read(
    "get_helm_release_history",
    "Show the revision history of a Helm release.",
);
pub const UPGRADE_HELM_RELEASE: OperationSpec = OperationSpec::mutating(
    "upgrade_helm_release",
    "Upgrade (or install) a release to a chart version. Atomic: rolled back on failure.",
);

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NamespaceParams {
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReleaseParams {
    #[schemars(description = "Release name, e.g. 'prowlarr'")]
    pub release_name: String,
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpgradeParams {
    #[schemars(description = "Release name, e.g. 'prowlarr'")]
    pub release_name: String,
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
    #[schemars(description = "Chart reference, e.g. 'prowlarr/prowlarr'")]
    pub chart: String,
    #[schemars(description = "Target chart version, e.g. '1.16.2'")]
    pub version: String,
}

pub struct HelmAdapter {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    kube_context: Option<String>,
}

impl HelmAdapter {
    pub fn new(config: &HelmConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            binary: config.binary.clone(),
            kube_context: config.kube_context.clone(),
        }
    }

    fn command(&self, args: Vec<String>) -> CommandSpec {
        let mut all = args;
        if let Some(context) = &self.kube_context {
            all.push("--kube-context".into());
            all.push(context.clone());
        }
        CommandSpec::new(&self.binary, all)
    }

    async fn run_json(&self, args: Vec<String>) -> Result<Value, AdapterError> {
        let mut args = args;
        args.extend(["-o".to_string(), "json".to_string()]);
        let output = self.runner.run(&self.command(args)).await?;
        if output.stdout.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        serde_json::from_str(&output.stdout)
            .map_err(|e| AdapterError::Parse(format!("helm output is not JSON: {e}")))
    }

    pub async fn list_releases(&self, namespace: &str) -> Result<Envelope, AdapterError> {
        cli_arg("namespace", namespace)?;
        let data = self
            .run_json(vec!["list".into(), "-n".into(), namespace.into()])
            .await?;
        Ok(into_envelope(data))
    }

    pub async fn release_status(&self, release: &str, namespace: &str) -> Result<Envelope, AdapterError> {
        cli_arg("release_name", release)?;
        cli_arg("namespace", namespace)?;
        let data = self
            .run_json(vec![
                "status".into(),
                release.into(),
                "-n".into(),
                namespace.into(),
            ])
            .await?;
        Ok(into_envelope(data))
    }

    pub async fn release_history(&self, release: &str, namespace: &str) -> Result<Envelope, AdapterError> {
        cli_arg("release_name", release)?;
        cli_arg("namespace", namespace)?;
        let data = self
            .run_json(vec![
                "history".into(),
                release.into(),
                "-n".into(),
                namespace.into(),
            ])
            .await?;
        Ok(into_envelope(data))
    }

    pub async fn upgrade_release(
        &self,
        release: &str,
        namespace: &str,
        chart: &str,
        version: &str,
    ) -> Result<Envelope, AdapterError> {
        cli_arg("release_name", release)?;
        cli_arg("namespace", namespace)?;
        cli_arg("chart", chart)?;
        cli_arg("version", version)?;

        let command = self.command(vec![
            "upgrade".into(),
            "--install".into(),
            release.into(),
            chart.into(),
            "--namespace".into(),
            namespace.into(),
            "--version".into(),
            version.into(),
            "--atomic".into(),
        ]);
        let output = self.runner.run(&command).await?;

        tracing::info!(release, namespace, chart, version, "helm release upgraded");
        Ok(Envelope::record(json!({
            "message": format!("Helm upgrade of {release} to {chart} {version} completed."),
            "output": output.stdout.trim(),
        })))
    }
}

/// Arrays become record lists; anything else is a single record.
fn into_envelope(data: Value) -> Envelope {
    match data {
        Value::Array(items) => Envelope::records(items),
        other => Envelope::record(other),
    }
}

pub fn toolset(ctx: &BuildContext) -> anyhow::Result<Toolset> {
    let adapter = Arc::new(HelmAdapter::new(&ctx.config.helm, Arc::clone(&ctx.runner)));
    Ok(vec![
        bind(&adapter, LIST_HELM_RELEASES, |a, p: NamespaceParams| async move {
            a.list_releases(&p.namespace).await
        }),
        bind(&adapter, GET_HELM_RELEASE_STATUS, |a, p: ReleaseParams| async move {
            a.release_status(&p.release_name, &p.namespace).await
        }),
        bind(&adapter, GET_HELM_RELEASE_HISTORY, |a, p: ReleaseParams| async move {
            a.release_history(&p.release_name, &p.namespace).await
        }),
        bind(&adapter, UPGRADE_HELM_RELEASE, |a, p: UpgradeParams| async move {
            a.upgrade_release(&p.release_name, &p.namespace, &p.chart, &p.version)
                .await
        }),
    ])
}
