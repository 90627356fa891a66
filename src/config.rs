use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EterniumConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub capabilities: CapabilitiesConfig,
    pub coordinator: CoordinatorConfig,
    pub memory: MemoryConfig,
    pub embedding: EmbeddingConfig,
    pub kubernetes: KubernetesConfig,
    pub harbor: HarborConfig,
    pub helm: HelmConfig,
    pub docker: DockerConfig,
    pub mysql: MysqlConfig,
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// OpenAI-compatible chat endpoint used for tool selection and synthesis.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

/// Per-capability enablement flags, consulted once at boot.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CapabilitiesConfig {
    pub docker: bool,
    pub harbor: bool,
    pub helm: bool,
    pub kubernetes: bool,
    pub memory: bool,
    pub mysql: bool,
    pub prometheus: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub context_probe: bool,
    pub max_tool_calls: usize,
    pub confirm_mutations: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub db_path: String,
    pub threshold: f64,
    pub context_results: usize,
    pub candidate_results: usize,
    pub drop_old: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub url: String,
    pub model: String,
    pub dimensions: usize,
}

/// Cluster API access. With no `api_url`, the in-cluster service account is used.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KubernetesConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<String>,
    pub ca_cert: Option<String>,
    pub insecure: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HarborConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
    pub ssl_verify: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HelmConfig {
    pub binary: String,
    pub kube_context: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DockerConfig {
    pub binary: String,
    pub host: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MysqlConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub backup_dir: String,
    pub dump_binary: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PrometheusConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            log_level: "info".into(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            model: None,
            timeout_secs: 120,
        }
    }
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            docker: true,
            harbor: true,
            helm: true,
            kubernetes: true,
            memory: true,
            mysql: true,
            prometheus: true,
        }
    }
}

impl CapabilitiesConfig {
    /// Enablement predicate for the blueprint table. Unknown names are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        match name {
            "docker" => self.docker,
            "harbor" => self.harbor,
            "helm" => self.helm,
            "kubernetes" => self.kubernetes,
            "memory" => self.memory,
            "mysql" => self.mysql,
            "prometheus" => self.prometheus,
            _ => false,
        }
    }

    fn set(&mut self, name: &str, enabled: bool) -> bool {
        let slot = match name {
            "docker" => &mut self.docker,
            "harbor" => &mut self.harbor,
            "helm" => &mut self.helm,
            "kubernetes" => &mut self.kubernetes,
            "memory" => &mut self.memory,
            "mysql" => &mut self.mysql,
            "prometheus" => &mut self.prometheus,
            _ => return false,
        };
        *slot = enabled;
        true
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            context_probe: true,
            max_tool_calls: 8,
            confirm_mutations: false,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let db_path = default_eternium_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            threshold: 0.7,
            context_results: 1,
            candidate_results: 3,
            drop_old: false,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            url: "http://localhost:11434".into(),
            model: "mxbai-embed-large:latest".into(),
            dimensions: 1024,
        }
    }
}

impl Default for HarborConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            token: None,
            ssl_verify: true,
        }
    }
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            binary: "helm".into(),
            kube_context: None,
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: "docker".into(),
            host: None,
        }
    }
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 3306,
            username: None,
            password: None,
            max_connections: 5,
            acquire_timeout_secs: 10,
            backup_dir: "/backups".into(),
            dump_binary: "mysqldump".into(),
        }
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9090".into(),
            username: None,
            password: None,
        }
    }
}

/// Returns `~/.eternium/`, or `./.eternium` when no home directory is known.
pub fn default_eternium_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eternium")
}

/// Returns the default config file path: `~/.eternium/config.toml`
pub fn default_config_path() -> PathBuf {
    default_eternium_dir().join("config.toml")
}

impl EterniumConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EterniumConfig::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("ETERNIUM_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Some(val) = lookup("ETERNIUM_HOST") {
            self.server.host = val;
        }
        if let Some(port) = lookup("ETERNIUM_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = lookup("ETERNIUM_DB") {
            self.memory.db_path = val;
        }
        for name in ["docker", "harbor", "helm", "kubernetes", "memory", "mysql", "prometheus"] {
            let key = format!("ETERNIUM_ENABLE_{}", name.to_uppercase());
            if let Some(enabled) = lookup(&key).as_deref().and_then(parse_flag) {
                self.capabilities.set(name, enabled);
            }
        }

        if let Some(val) = lookup("LLM_URL") {
            self.llm.url = Some(val);
        }
        if let Some(val) = lookup("LLM_TOKEN") {
            self.llm.token = Some(val);
        }
        if let Some(val) = lookup("LLM_MODEL") {
            self.llm.model = Some(val);
        }
        if let Some(val) = lookup("EMBEDDING_URL") {
            self.embedding.url = val;
        }
        if let Some(val) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = val;
        }
        if let Some(threshold) = lookup("MEMORY_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.memory.threshold = threshold;
        }

        if let Some(val) = lookup("HARBOR_URL") {
            self.harbor.url = Some(val);
        }
        if let Some(val) = lookup("HARBOR_USERNAME") {
            self.harbor.username = Some(val);
        }
        if let Some(val) = lookup("HARBOR_TOKEN") {
            self.harbor.token = Some(val);
        }
        if let Some(val) = lookup("PROMETHEUS_URL") {
            self.prometheus.url = val;
        }
        if let Some(val) = lookup("MYSQL_HOST") {
            self.mysql.host = Some(val);
        }
        if let Some(port) = lookup("MYSQL_PORT").and_then(|v| v.parse().ok()) {
            self.mysql.port = port;
        }
        if let Some(val) = lookup("MYSQL_USERNAME") {
            self.mysql.username = Some(val);
        }
        if let Some(val) = lookup("MYSQL_PASSWORD") {
            self.mysql.password = Some(val);
        }
    }

    /// Resolve the memory database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.memory.db_path)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = EterniumConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.memory.threshold, 0.7);
        assert_eq!(config.memory.context_results, 1);
        assert_eq!(config.memory.candidate_results, 3);
        assert_eq!(config.embedding.provider, "ollama");
        assert!(config.memory.db_path.ends_with("memory.db"));
        assert!(config.capabilities.is_enabled("kubernetes"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[capabilities]
mysql = false
docker = false

[memory]
db_path = "/tmp/test.db"
threshold = 0.5

[harbor]
url = "https://harbor.lab"
ssl_verify = false
"#;
        let config: EterniumConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.memory.db_path, "/tmp/test.db");
        assert_eq!(config.memory.threshold, 0.5);
        assert!(!config.capabilities.is_enabled("mysql"));
        assert!(!config.capabilities.is_enabled("docker"));
        assert!(config.capabilities.is_enabled("helm"));
        assert_eq!(config.harbor.url.as_deref(), Some("https://harbor.lab"));
        assert!(!config.harbor.ssl_verify);
        // defaults still apply for unset fields
        assert_eq!(config.memory.candidate_results, 3);
        assert_eq!(config.mysql.port, 3306);
    }

    #[test]
    fn overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ETERNIUM_DB", "/tmp/override.db"),
            ("ETERNIUM_LOG_LEVEL", "trace"),
            ("ETERNIUM_ENABLE_HELM", "false"),
            ("ETERNIUM_ENABLE_MEMORY", "not-a-flag"),
            ("LLM_MODEL", "qwen2.5:14b"),
            ("MEMORY_THRESHOLD", "0.45"),
            ("MYSQL_PORT", "3307"),
        ]);
        let mut config = EterniumConfig::default();

        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.memory.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert!(!config.capabilities.is_enabled("helm"));
        assert!(config.capabilities.is_enabled("memory"));
        assert_eq!(config.llm.model.as_deref(), Some("qwen2.5:14b"));
        assert_eq!(config.memory.threshold, 0.45);
        assert_eq!(config.mysql.port, 3307);
    }

    #[test]
    fn unknown_capability_is_disabled() {
        let config = CapabilitiesConfig::default();
        assert!(!config.is_enabled("ansible"));
    }
}
