//! Kubernetes REST API adapter.
//!
//! Talks to the API server directly over `reqwest`: either an explicit
//! `kubernetes.api_url` with a bearer token, or the in-cluster service account.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method, Url};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{at, http_error, items, json_body, AdapterError};
use crate::config::KubernetesConfig;
use crate::envelope::Envelope;
use crate::registry::BuildContext;
use crate::tool::{bind, NoParams, OperationSpec, Toolset};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const MAX_EVENTS: usize = 10;
const DEFAULT_TAIL_LINES: u32 = 100;

pub const GET_PODS: OperationSpec = OperationSpec::read(
    "get_pods",
    "List pods in a namespace with their phase and restart count.",
);
pub const GET_DEPLOYMENTS: OperationSpec = OperationSpec::read(
    "get_deployments",
    "List deployments in a namespace with ready and desired replicas.",
);
pub const GET_STATEFULSETS: OperationSpec = OperationSpec::read(
    "get_statefulsets",
    "List statefulsets in a namespace with ready and desired replicas.",
);
pub const GET_DAEMONSETS: OperationSpec = OperationSpec::read(
    "get_daemonsets",
    "List daemonsets in a namespace with desired and ready pod counts.",
);
pub const GET_NAMESPACES: OperationSpec =
    OperationSpec::read("get_namespaces", "List all namespaces in the cluster.");
pub const GET_INGRESSES: OperationSpec = OperationSpec::read(
    "get_ingresses",
    "List ingresses in a namespace with hosts and path-to-service routes.",
);
pub const GET_SERVICES: OperationSpec = OperationSpec::read(
    "get_services",
    "List services in a namespace with type, cluster IP, ports and selector.",
);
pub const GET_LOGS: OperationSpec = OperationSpec::read(
    "get_logs",
    "Fetch recent logs of a pod, or of the first pod of a deployment, statefulset or daemonset.",
);
pub const SCALE_DEPLOYMENT: OperationSpec = OperationSpec::mutating(
    "scale_deployment",
    "Set the replica count of a deployment.",
);
pub const DELETE_POD: OperationSpec = OperationSpec::mutating(
    "delete_pod",
    "Delete a pod (its controller will usually recreate it).",
);
pub const DESCRIBE_RESOURCE: OperationSpec = OperationSpec::read(
    "describe_resource",
    "Describe a pod, service, deployment, statefulset, daemonset or ingress with its 10 most recent events. Use this to diagnose failures.",
);

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NamespaceParams {
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LogsParams {
    #[schemars(description = "Resource name")]
    pub name: String,
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
    #[schemars(description = "pod, deployment, statefulset or daemonset. Defaults to pod.")]
    #[serde(default = "default_kind")]
    pub kind: String,
    #[schemars(description = "Number of log lines from the end. Defaults to 100.")]
    pub tail_lines: Option<u32>,
    #[schemars(description = "Logs of the previous container instance (pods only)")]
    #[serde(default)]
    pub previous: bool,
}

fn default_kind() -> String {
    "pod".into()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScaleParams {
    #[schemars(description = "Deployment name")]
    pub deployment_name: String,
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
    #[schemars(description = "Desired replica count")]
    pub replicas: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeletePodParams {
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
    #[schemars(description = "Pod name")]
    pub pod_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeParams {
    #[schemars(description = "Resource name")]
    pub name: String,
    #[schemars(description = "Kubernetes namespace")]
    pub namespace: String,
    #[schemars(description = "pod, service (svc), deployment, statefulset, daemonset or ingress")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Pod,
    Service,
    Deployment,
    StatefulSet,
    DaemonSet,
    Ingress,
}

impl Kind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "pod" | "pods" | "po" => Some(Self::Pod),
            "service" | "services" | "svc" => Some(Self::Service),
            "deployment" | "deployments" | "deploy" => Some(Self::Deployment),
            "statefulset" | "statefulsets" | "sts" => Some(Self::StatefulSet),
            "daemonset" | "daemonsets" | "ds" => Some(Self::DaemonSet),
            "ingress" | "ingresses" | "ing" => Some(Self::Ingress),
            _ => None,
        }
    }

    /// `kind` value of `involvedObject` in events.
    pub fn event_kind(self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Service => "Service",
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Ingress => "Ingress",
        }
    }

    fn collection(self, namespace: &str) -> String {
        match self {
            Self::Pod => format!("/api/v1/namespaces/{namespace}/pods"),
            Self::Service => format!("/api/v1/namespaces/{namespace}/services"),
            Self::Deployment => format!("/apis/apps/v1/namespaces/{namespace}/deployments"),
            Self::StatefulSet => format!("/apis/apps/v1/namespaces/{namespace}/statefulsets"),
            Self::DaemonSet => format!("/apis/apps/v1/namespaces/{namespace}/daemonsets"),
            Self::Ingress => {
                format!("/apis/networking.k8s.io/v1/namespaces/{namespace}/ingresses")
            }
        }
    }

    fn is_controller(self) -> bool {
        matches!(self, Self::Deployment | Self::StatefulSet | Self::DaemonSet)
    }
}

/// Names and namespaces are spliced into URL paths, so only DNS-style names pass.
fn check_name(field: &str, value: &str) -> Result<(), AdapterError> {
    let valid = value.len() <= 253
        && value.starts_with(|c: char| c.is_ascii_alphanumeric())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(AdapterError::invalid(format!(
            "{field} '{value}' is not a valid Kubernetes name"
        )))
    }
}

/// API server location and credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAccess {
    pub api_url: String,
    pub token: Option<String>,
    pub ca_cert: Option<String>,
    pub insecure: bool,
}

impl ClusterAccess {
    /// Explicit configuration first, then the in-cluster service account.
    pub fn resolve(
        config: &KubernetesConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let sa_token = format!("{SERVICE_ACCOUNT_DIR}/token");
        let sa_ca = format!("{SERVICE_ACCOUNT_DIR}/ca.crt");

        let (api_url, token_file, ca_cert) = match (&config.api_url, env("KUBERNETES_SERVICE_HOST")) {
            (Some(url), _) => (
                url.trim_end_matches('/').to_string(),
                config.token_file.clone(),
                config.ca_cert.clone(),
            ),
            (None, Some(host)) => {
                let port = env("KUBERNETES_SERVICE_PORT").unwrap_or_else(|| "443".into());
                let host = if host.contains(':') {
                    format!("[{host}]")
                } else {
                    host
                };
                (
                    format!("https://{host}:{port}"),
                    config.token_file.clone().or(Some(sa_token)),
                    config
                        .ca_cert
                        .clone()
                        .or_else(|| Path::new(&sa_ca).exists().then_some(sa_ca)),
                )
            }
            (None, None) => anyhow::bail!(
                "no Kubernetes API configured: set kubernetes.api_url or run inside a cluster"
            ),
        };

        let token = match (&config.token, token_file) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(path)) => Some(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read service account token {path}"))?
                    .trim()
                    .to_string(),
            ),
            (None, None) => None,
        };

        Ok(Self {
            api_url,
            token,
            ca_cert,
            insecure: config.insecure,
        })
    }
}

pub struct KubernetesAdapter {
    client: Client,
    access: ClusterAccess,
}

impl KubernetesAdapter {
    pub fn new(access: ClusterAccess) -> anyhow::Result<Self> {
        Url::parse(&access.api_url)
            .with_context(|| format!("invalid Kubernetes API URL: {}", access.api_url))?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(access.insecure);
        if let Some(path) = &access.ca_cert {
            let pem = std::fs::read(path)
                .with_context(|| format!("failed to read cluster CA {path}"))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .with_context(|| format!("invalid cluster CA {path}"))?;
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            client: builder.build().context("failed to build HTTP client")?,
            access,
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, AdapterError> {
        let mut url = Url::parse(&format!("{}{path}", self.access.api_url))
            .map_err(|e| AdapterError::invalid(format!("invalid API path {path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, AdapterError> {
        let url = self.url(path, query)?;
        tracing::debug!(%url, "kubernetes GET");
        let response = self.request(Method::GET, url).send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        json_body(response).await
    }

    async fn list(&self, kind: Kind, namespace: &str) -> Result<Value, AdapterError> {
        check_name("namespace", namespace)?;
        self.get_json(&kind.collection(namespace), &[]).await
    }

    async fn read(&self, kind: Kind, namespace: &str, name: &str) -> Result<Value, AdapterError> {
        check_name("namespace", namespace)?;
        check_name("name", name)?;
        self.get_json(&format!("{}/{name}", kind.collection(namespace)), &[])
            .await
    }

    pub async fn get_pods(&self, namespace: &str) -> Result<Envelope, AdapterError> {
        let data = self.list(Kind::Pod, namespace).await?;
        Ok(Envelope::records(items(&data, "/items").iter().map(pod_summary).collect()))
    }

    pub async fn get_deployments(&self, namespace: &str) -> Result<Envelope, AdapterError> {
        let data = self.list(Kind::Deployment, namespace).await?;
        Ok(Envelope::records(
            items(&data, "/items")
                .iter()
                .map(|d| replica_summary(d, "/status/availableReplicas"))
                .collect(),
        ))
    }

    pub async fn get_statefulsets(&self, namespace: &str) -> Result<Envelope, AdapterError> {
        let data = self.list(Kind::StatefulSet, namespace).await?;
        Ok(Envelope::records(
            items(&data, "/items")
                .iter()
                .map(|s| replica_summary(s, "/status/readyReplicas"))
                .collect(),
        ))
    }

    pub async fn get_daemonsets(&self, namespace: &str) -> Result<Envelope, AdapterError> {
        let data = self.list(Kind::DaemonSet, namespace).await?;
        Ok(Envelope::records(
            items(&data, "/items")
                .iter()
                .map(|ds| {
                    json!({
                        "name": at(ds, "/metadata/name"),
                        "desired_scheduled": at(ds, "/status/desiredNumberScheduled").as_u64().unwrap_or(0),
                        "ready": at(ds, "/status/numberReady").as_u64().unwrap_or(0),
                    })
                })
                .collect(),
        ))
    }

    pub async fn get_namespaces(&self) -> Result<Envelope, AdapterError> {
        let data = self.get_json("/api/v1/namespaces", &[]).await?;
        Ok(Envelope::records(
            items(&data, "/items")
                .iter()
                .map(|ns| at(ns, "/metadata/name").clone())
                .collect(),
        ))
    }

    pub async fn get_ingresses(&self, namespace: &str) -> Result<Envelope, AdapterError> {
        let data = self.list(Kind::Ingress, namespace).await?;
        Ok(Envelope::records(
            items(&data, "/items").iter().map(ingress_summary).collect(),
        ))
    }

    pub async fn get_services(&self, namespace: &str) -> Result<Envelope, AdapterError> {
        let data = self.list(Kind::Service, namespace).await?;
        Ok(Envelope::records(
            items(&data, "/items").iter().map(service_summary).collect(),
        ))
    }

    pub async fn get_logs(
        &self,
        name: &str,
        namespace: &str,
        kind: &str,
        tail_lines: Option<u32>,
        previous: bool,
    ) -> Result<Envelope, AdapterError> {
        check_name("namespace", namespace)?;
        let kind = Kind::parse(kind)
            .filter(|k| *k == Kind::Pod || k.is_controller())
            .ok_or_else(|| {
                AdapterError::invalid(format!("getting logs for kind '{kind}' is not supported"))
            })?;

        let pod = if kind.is_controller() {
            let controller = self.read(kind, namespace, name).await?;
            let selector = label_selector(&controller).ok_or_else(|| {
                AdapterError::NotFound(format!(
                    "{}/{name} has no label selector",
                    kind.event_kind()
                ))
            })?;
            let pods = self
                .get_json(
                    &Kind::Pod.collection(namespace),
                    &[("labelSelector", selector)],
                )
                .await?;
            items(&pods, "/items")
                .first()
                .and_then(|p| at(p, "/metadata/name").as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    AdapterError::NotFound(format!(
                        "no pods found for {}/{name}",
                        kind.event_kind().to_lowercase()
                    ))
                })?
        } else {
            check_name("name", name)?;
            name.to_string()
        };

        // `previous` only makes sense for a pod named directly.
        let previous = previous && !kind.is_controller();
        let url = self.url(
            &format!("{}/{pod}/log", Kind::Pod.collection(namespace)),
            &[
                ("tailLines", tail_lines.unwrap_or(DEFAULT_TAIL_LINES).to_string()),
                ("previous", previous.to_string()),
            ],
        )?;
        let response = self.request(Method::GET, url).send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        let mut logs = response.text().await?;
        if logs.is_empty() {
            logs = "No logs found.".into();
        }

        let mut source = format!("{}/{name}", kind.event_kind().to_lowercase());
        if kind.is_controller() {
            source.push_str(&format!(" (via pod '{pod}')"));
        }
        Ok(Envelope::record(json!({
            "source": source,
            "log_content": logs,
        })))
    }

    pub async fn scale_deployment(
        &self,
        name: &str,
        namespace: &str,
        replicas: u32,
    ) -> Result<Envelope, AdapterError> {
        check_name("namespace", namespace)?;
        check_name("deployment_name", name)?;
        let url = self.url(
            &format!("{}/{name}/scale", Kind::Deployment.collection(namespace)),
            &[],
        )?;
        let response = self
            .request(Method::PATCH, url)
            .header(reqwest::header::CONTENT_TYPE, "application/merge-patch+json")
            .body(json!({ "spec": { "replicas": replicas } }).to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        tracing::info!(deployment = name, namespace, replicas, "deployment scaled");
        Ok(Envelope::success(format!(
            "Scale command issued for {name}: {replicas} replicas."
        )))
    }

    pub async fn delete_pod(&self, namespace: &str, pod_name: &str) -> Result<Envelope, AdapterError> {
        check_name("namespace", namespace)?;
        check_name("pod_name", pod_name)?;
        let url = self.url(&format!("{}/{pod_name}", Kind::Pod.collection(namespace)), &[])?;
        let response = self.request(Method::DELETE, url).send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        tracing::info!(pod = pod_name, namespace, "pod deleted");
        Ok(Envelope::success(format!(
            "Delete command issued for pod '{pod_name}'."
        )))
    }

    pub async fn describe_resource(
        &self,
        name: &str,
        namespace: &str,
        kind: &str,
    ) -> Result<Envelope, AdapterError> {
        let kind = Kind::parse(kind).ok_or_else(|| {
            AdapterError::invalid(format!("describing resources of kind '{kind}' is not supported"))
        })?;
        let resource = self.read(kind, namespace, name).await?;

        let selector = format!(
            "involvedObject.name={name},involvedObject.namespace={namespace},involvedObject.kind={}",
            kind.event_kind()
        );
        let events = self
            .get_json(
                &format!("/api/v1/namespaces/{namespace}/events"),
                &[("fieldSelector", selector)],
            )
            .await?;

        Ok(Envelope::record(json!({
            "kind": kind.event_kind(),
            "name": name,
            "namespace": namespace,
            "resource_info": resource_info(kind, &resource),
            "events": recent_events(items(&events, "/items"), MAX_EVENTS),
        })))
    }
}

fn pod_summary(pod: &Value) -> Value {
    let restarts: u64 = items(pod, "/status/containerStatuses")
        .iter()
        .filter_map(|c| c["restartCount"].as_u64())
        .sum();
    json!({
        "name": at(pod, "/metadata/name"),
        "status": at(pod, "/status/phase"),
        "restarts": restarts,
    })
}

fn replica_summary(resource: &Value, ready_pointer: &str) -> Value {
    json!({
        "name": at(resource, "/metadata/name"),
        "ready_replicas": at(resource, ready_pointer).as_u64().unwrap_or(0),
        "desired_replicas": at(resource, "/spec/replicas"),
    })
}

fn ingress_summary(ingress: &Value) -> Value {
    let rules: Vec<Value> = items(ingress, "/spec/rules")
        .iter()
        .filter(|rule| !items(rule, "/http/paths").is_empty())
        .map(|rule| {
            let paths: Vec<String> = items(rule, "/http/paths")
                .iter()
                .map(|p| {
                    let service = at(p, "/backend/service/name").as_str().unwrap_or("?");
                    let port = match at(p, "/backend/service/port/number") {
                        Value::Number(n) => n.to_string(),
                        _ => at(p, "/backend/service/port/name")
                            .as_str()
                            .unwrap_or("?")
                            .to_string(),
                    };
                    format!(
                        "{} -> {service}:{port}",
                        at(p, "/path").as_str().unwrap_or("/")
                    )
                })
                .collect();
            json!({ "host": at(rule, "/host"), "paths": paths })
        })
        .collect();
    json!({ "name": at(ingress, "/metadata/name"), "rules": rules })
}

fn service_summary(svc: &Value) -> Value {
    let ports: Vec<Value> = items(svc, "/spec/ports")
        .iter()
        .map(|p| {
            json!({
                "port": p["port"],
                "target_port": p["targetPort"],
                "protocol": p["protocol"],
                "name": p["name"],
            })
        })
        .collect();
    let selector = match at(svc, "/spec/selector") {
        Value::Null => json!({}),
        other => other.clone(),
    };
    json!({
        "name": at(svc, "/metadata/name"),
        "type": at(svc, "/spec/type"),
        "cluster_ip": at(svc, "/spec/clusterIP"),
        "ports": ports,
        "selector": selector,
        "creation_timestamp": at(svc, "/metadata/creationTimestamp"),
    })
}

fn resource_info(kind: Kind, r: &Value) -> Value {
    let ready_of = |ready: &str| {
        format!(
            "{}/{}",
            at(r, ready).as_u64().unwrap_or(0),
            at(r, "/spec/replicas").as_u64().unwrap_or(0)
        )
    };
    match kind {
        Kind::Pod => json!({
            "status": at(r, "/status/phase"),
            "ip": at(r, "/status/podIP"),
            "node": at(r, "/spec/nodeName"),
        }),
        Kind::Service => {
            let ports: Vec<String> = items(r, "/spec/ports")
                .iter()
                .map(|p| {
                    format!(
                        "{}/{}",
                        p["port"],
                        p["protocol"].as_str().unwrap_or("TCP")
                    )
                })
                .collect();
            json!({
                "type": at(r, "/spec/type"),
                "cluster_ip": at(r, "/spec/clusterIP"),
                "ports": ports,
            })
        }
        Kind::Deployment => json!({
            "replicas": ready_of("/status/availableReplicas"),
            "strategy": at(r, "/spec/strategy/type"),
        }),
        Kind::StatefulSet => json!({ "replicas": ready_of("/status/readyReplicas") }),
        Kind::DaemonSet => json!({
            "desired": at(r, "/status/desiredNumberScheduled"),
            "ready": at(r, "/status/numberReady"),
        }),
        Kind::Ingress => {
            let hosts: Vec<Value> = items(r, "/spec/rules")
                .iter()
                .map(|rule| rule["host"].clone())
                .collect();
            json!({ "class": at(r, "/spec/ingressClassName"), "hosts": hosts })
        }
    }
}

/// Newest first, at most `limit`.
fn recent_events(events: &[Value], limit: usize) -> Vec<Value> {
    let mut out: Vec<Value> = events
        .iter()
        .map(|e| {
            let timestamp = [
                "/lastTimestamp",
                "/eventTime",
                "/metadata/creationTimestamp",
            ]
            .iter()
            .map(|p| at(e, p))
            .find(|v| v.is_string())
            .cloned()
            .unwrap_or(Value::Null);
            json!({
                "timestamp": timestamp,
                "type": e["type"],
                "reason": e["reason"],
                "message": e["message"],
            })
        })
        .collect();
    // RFC 3339 timestamps in UTC sort lexically.
    out.sort_by(|a, b| {
        let a = a["timestamp"].as_str().unwrap_or("");
        let b = b["timestamp"].as_str().unwrap_or("");
        b.cmp(a)
    });
    out.truncate(limit);
    out
}

fn label_selector(controller: &Value) -> Option<String> {
    let labels = at(controller, "/spec/selector/matchLabels").as_object()?;
    if labels.is_empty() {
        return None;
    }
    Some(
        labels
            .iter()
            .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(","),
    )
}

pub fn toolset(ctx: &BuildContext) -> anyhow::Result<Toolset> {
    let access = ClusterAccess::resolve(&ctx.config.kubernetes, |key| std::env::var(key).ok())?;
    Ok(toolset_for(Arc::new(KubernetesAdapter::new(access)?)))
}

pub fn toolset_for(adapter: Arc<KubernetesAdapter>) -> Toolset {
    vec![
        bind(&adapter, GET_PODS, |a, p: NamespaceParams| async move {
            a.get_pods(&p.namespace).await
        }),
        bind(&adapter, GET_DEPLOYMENTS, |a, p: NamespaceParams| async move {
            a.get_deployments(&p.namespace).await
        }),
        bind(&adapter, GET_STATEFULSETS, |a, p: NamespaceParams| async move {
            a.get_statefulsets(&p.namespace).await
        }),
        bind(&adapter, GET_DAEMONSETS, |a, p: NamespaceParams| async move {
            a.get_daemonsets(&p.namespace).await
        }),
        bind(&adapter, GET_NAMESPACES, |a, _: NoParams| async move {
            a.get_namespaces().await
        }),
        bind(&adapter, GET_INGRESSES, |a, p: NamespaceParams| async move {
            a.get_ingresses(&p.namespace).await
        }),
        bind(&adapter, GET_SERVICES, |a, p: NamespaceParams| async move {
            a.get_services(&p.namespace).await
        }),
        bind(&adapter, GET_LOGS, |a, p: LogsParams| async move {
            a.get_logs(&p.name, &p.namespace, &p.kind, p.tail_lines, p.previous)
                .await
        }),
        bind(&adapter, SCALE_DEPLOYMENT, |a, p: ScaleParams| async move {
            a.scale_deployment(&p.deployment_name, &p.namespace, p.replicas)
                .await
        }),
        bind(&adapter, DELETE_POD, |a, p: DeletePodParams| async move {
            a.delete_pod(&p.namespace, &p.pod_name).await
        }),
        bind(&adapter, DESCRIBE_RESOURCE, |a, p: DescribeParams| async move {
            a.describe_resource(&p.name, &p.namespace, &p.kind).await
        }),
    ]
}
