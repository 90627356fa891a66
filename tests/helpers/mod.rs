#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eternium::adapters::{AdapterError, CommandOutput, CommandRunner, CommandSpec};
use eternium::config::EterniumConfig;
use eternium::db::{self, OpenOptions};
use eternium::embedding::EmbeddingProvider;
use eternium::llm::{Completion, CompletionRequest, ModelRuntime, ToolCall};
use eternium::memory::MemoryStore;
use eternium::registry::BuildContext;
use serde_json::Value;

pub const DIM: usize = 8;

/// Unit vector with a spike at `index`. Distinct spikes are sqrt(2) apart.
pub fn spike(index: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[index % DIM] = 1.0;
    v
}

/// Unit vector between two spikes, weighted towards `a`.
pub fn blend(a: usize, b: usize, weight_a: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[a % DIM] += weight_a;
    v[b % DIM] += 1.0 - weight_a;
    eternium::embedding::l2_normalize(&v)
}

/// Embedding provider with fixed vectors per text. Unknown text is an error.
#[derive(Default)]
pub struct StubEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no stub vector for {text:?}"))
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model(&self) -> &str {
        "stub"
    }
}

/// Model runtime that replays queued completions and records what it was sent.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<anyhow::Result<Completion>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_call(self, name: &str, arguments: Value) -> Self {
        let id = format!("call_{}", self.script.lock().unwrap().len());
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(Completion::ToolCalls(vec![ToolCall {
                id,
                name: name.to_string(),
                arguments,
            }])));
        self
    }

    pub fn then_text(self, text: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(Completion::Text(text.to_string())));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(anyhow::anyhow!(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelRuntime for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<Completion> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::Text("done".into())))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Command runner that records every command and replays queued outputs.
#[derive(Default)]
pub struct FakeRunner {
    outputs: Mutex<VecDeque<Result<CommandOutput, AdapterError>>>,
    commands: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_stdout(self, stdout: &str) -> Self {
        self.outputs.lock().unwrap().push_back(Ok(CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
        }));
        self
    }

    pub fn then_fail(self, stderr: &str) -> Self {
        self.outputs.lock().unwrap().push_back(Err(AdapterError::Command {
            command: "fake".into(),
            stderr: stderr.to_string(),
        }));
        self
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, AdapterError> {
        self.commands.lock().unwrap().push(command.clone());
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutput::default()))
    }

    async fn run_to_file(&self, command: &CommandSpec, path: &Path) -> Result<u64, AdapterError> {
        let output = self.run(command).await?;
        std::fs::write(path, output.stdout.as_bytes())?;
        Ok(output.stdout.len() as u64)
    }
}

/// Config with every capability off and memory in `dir`.
pub fn test_config(dir: &tempfile::TempDir) -> EterniumConfig {
    let mut config = EterniumConfig::default();
    for name in ["docker", "harbor", "helm", "kubernetes", "memory", "mysql", "prometheus"] {
        set_enabled(&mut config, name, false);
    }
    config.memory.db_path = dir.path().join("memory.db").to_string_lossy().into_owned();
    config.embedding.dimensions = DIM;
    config.coordinator.context_probe = false;
    config
}

pub fn set_enabled(config: &mut EterniumConfig, name: &str, enabled: bool) {
    let caps = &mut config.capabilities;
    match name {
        "docker" => caps.docker = enabled,
        "harbor" => caps.harbor = enabled,
        "helm" => caps.helm = enabled,
        "kubernetes" => caps.kubernetes = enabled,
        "memory" => caps.memory = enabled,
        "mysql" => caps.mysql = enabled,
        "prometheus" => caps.prometheus = enabled,
        other => panic!("unknown capability {other}"),
    }
}

pub fn context(
    config: EterniumConfig,
    model: Arc<dyn ModelRuntime>,
    runner: Arc<dyn CommandRunner>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> BuildContext {
    BuildContext {
        config: Arc::new(config),
        model,
        runner,
        embedder,
    }
}

/// In-memory store over `embedder` with default thresholds.
pub fn memory_store(embedder: StubEmbedder) -> MemoryStore {
    let conn = db::open_memory_database(&OpenOptions {
        model: "stub",
        dimensions: DIM,
        drop_old: false,
    })
    .unwrap();
    MemoryStore::with_connection(conn, Arc::new(embedder), &Default::default())
}
