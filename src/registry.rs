//! Capability registry: the static blueprint table and boot-time assembly.
//!
//! [`BLUEPRINTS`] lists every capability in priority order. [`assemble`] walks
//! it once, skipping disabled entries and entries whose factory fails, and
//! hands the surviving workers to the coordinator.

use std::collections::HashSet;
use std::sync::Arc;

use crate::adapters::{self, CommandRunner, ProcessRunner};
use crate::config::EterniumConfig;
use crate::embedding::EmbeddingProvider;
use crate::llm::ModelRuntime;
use crate::memory;
use crate::tool::Toolset;
use crate::worker::Worker;

/// Shared dependencies handed to every capability factory.
#[derive(Clone)]
pub struct BuildContext {
    pub config: Arc<EterniumConfig>,
    pub model: Arc<dyn ModelRuntime>,
    pub runner: Arc<dyn CommandRunner>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl BuildContext {
    /// Context for a real process: CLIs run through [`ProcessRunner`].
    pub fn new(
        config: Arc<EterniumConfig>,
        model: Arc<dyn ModelRuntime>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            config,
            model,
            runner: Arc::new(ProcessRunner),
            embedder,
        }
    }
}

pub type Factory = fn(&BuildContext) -> anyhow::Result<Toolset>;

/// One row of the blueprint table.
#[derive(Clone, Copy)]
pub struct Blueprint {
    pub name: &'static str,
    pub agent: &'static str,
    /// Delegation rule text shown to the model and listed by `/capabilities`.
    pub routing_hint: &'static str,
    /// Request words that route to this capability.
    pub keywords: &'static [&'static str],
    pub construct: Factory,
}

pub static BLUEPRINTS: &[Blueprint] = &[
    Blueprint {
        name: "docker",
        agent: "docker_agent",
        routing_hint: "For pulling, retagging or pushing container images with the Docker CLI, delegate to docker_agent.",
        keywords: &["docker", "pull", "retag", "push", "container image"],
        construct: adapters::docker::toolset,
    },
    Blueprint {
        name: "harbor",
        agent: "harbor_agent",
        routing_hint: "For the Harbor registry (projects, repositories, image tags, vulnerability scans), delegate to harbor_agent.",
        keywords: &["harbor", "registry", "repository", "repo", "tags", "vulnerability", "vulnerabilities", "cve", "scan", "project"],
        construct: adapters::harbor::toolset,
    },
    Blueprint {
        name: "helm",
        agent: "helm_agent",
        routing_hint: "For Helm releases (list, status, history, upgrade), delegate to helm_agent.",
        keywords: &["helm", "release", "chart", "upgrade", "rollout history"],
        construct: adapters::helm::toolset,
    },
    Blueprint {
        name: "kubernetes",
        agent: "kubernetes_agent",
        routing_hint: "For Kubernetes cluster state (pods, deployments, statefulsets, daemonsets, services, ingresses, namespaces, logs, scaling, describing resources), delegate to kubernetes_agent.",
        keywords: &[
            "kubernetes", "k8s", "kubectl", "cluster", "pod", "deployment", "statefulset",
            "daemonset", "namespace", "ingress", "service", "svc", "logs", "scale", "describe",
            "node",
        ],
        construct: adapters::kubernetes::toolset,
    },
    Blueprint {
        name: "memory",
        agent: "memory_agent",
        routing_hint: "For remembering, recalling or forgetting facts about the homelab, delegate to memory_agent.",
        keywords: &["remember", "memory", "recall", "forget", "note", "notes", "fact"],
        construct: memory::tools::toolset,
    },
    Blueprint {
        name: "mysql",
        agent: "mysql_agent",
        routing_hint: "For MySQL databases (create databases, manage users, grant privileges, backups, SQL queries), delegate to mysql_agent.",
        keywords: &["mysql", "database", "sql", "backup", "grant", "privilege", "schema", "table", "user"],
        construct: adapters::mysql::toolset,
    },
    Blueprint {
        name: "prometheus",
        agent: "prometheus_agent",
        routing_hint: "For metrics, alerts and PromQL queries against Prometheus, delegate to prometheus_agent.",
        keywords: &["prometheus", "promql", "metric", "cpu", "usage", "alert", "uptime", "latency", "memory usage"],
        construct: adapters::prometheus::toolset,
    },
];

/// Workers and routing hints in declaration order.
#[derive(Debug, Default)]
pub struct Assembly {
    pub workers: Vec<Arc<Worker>>,
    pub routing_hints: Vec<&'static str>,
}

impl Assembly {
    /// The routing hints joined into the delegation section of a prompt.
    pub fn delegation_rules(&self) -> String {
        self.routing_hints
            .iter()
            .map(|hint| format!("- {hint}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.workers.iter().map(|w| w.name()).collect()
    }
}

/// Build a worker for every enabled blueprint. Never fails: disabled entries
/// are absent, and a failing factory removes only its own capability.
pub fn assemble(
    blueprints: &[Blueprint],
    ctx: &BuildContext,
    enabled: impl Fn(&str) -> bool,
) -> Assembly {
    let mut assembly = Assembly::default();
    let mut seen = HashSet::new();

    for blueprint in blueprints {
        if !enabled(blueprint.name) {
            tracing::debug!(capability = blueprint.name, "capability disabled");
            continue;
        }
        if !seen.insert(blueprint.name) {
            tracing::warn!(capability = blueprint.name, "duplicate capability name, skipping");
            continue;
        }

        let tools = match (blueprint.construct)(ctx) {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!(capability = blueprint.name, error = %format!("{e:#}"), "capability unavailable, skipping");
                continue;
            }
        };

        tracing::info!(
            capability = blueprint.name,
            operations = tools.len(),
            "capability registered"
        );
        assembly.workers.push(Arc::new(Worker::new(
            blueprint.name,
            blueprint.agent,
            blueprint.routing_hint,
            blueprint.keywords,
            tools,
            Arc::clone(&ctx.model),
        )));
        assembly.routing_hints.push(blueprint.routing_hint);
    }

    assembly
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blueprint_names_are_unique_and_ordered() {
        let names: Vec<&str> = BLUEPRINTS.iter().map(|b| b.name).collect();
        assert_eq!(
            names,
            vec!["docker", "harbor", "helm", "kubernetes", "memory", "mysql", "prometheus"]
        );
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn delegation_rules_follow_hint_order() {
        let assembly = Assembly {
            workers: Vec::new(),
            routing_hints: vec!["first", "second"],
        };
        assert_eq!(assembly.delegation_rules(), "- first\n- second");
    }
}
