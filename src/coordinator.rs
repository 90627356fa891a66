//! Request routing and answer synthesis.
//!
//! A request walks four steps, in order: an advisory memory probe, keyword
//! selection of exactly one worker, that worker's tool loop, and synthesis of
//! the final text. Error envelopes produced along the way always reach the
//! reply text.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::config::CoordinatorConfig;
use crate::envelope::{Envelope, EnvelopeStatus};
use crate::registry::Assembly;
use crate::tool::Invocation;
use crate::worker::{CallRecord, Finish, RunPolicy, Worker, WorkerRun};

/// Name of the worker consulted by the context probe.
pub const MEMORY_WORKER: &str = "memory";

/// Verbs that, opening a request, make it a memory request.
const MEMORY_INTENTS: &[&str] = &["remember", "forget", "note", "recall"];
const LEADING_FILLER: &[&str] = &["please", "also", "and"];

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// The operator has approved mutating operations for this request.
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Answered,
    /// Answered, but at least one operation returned an error.
    PartialFailure,
    /// A mutating operation was held back and needs a confirmed retry.
    AwaitingConfirmation,
    NoCapableWorker,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub status: ReplyStatus,
    pub worker: Option<&'static str>,
    pub text: String,
    pub calls: Vec<CallRecord>,
}

pub struct Coordinator {
    assembly: Assembly,
    context_probe: bool,
    max_tool_calls: usize,
    confirm_mutations: bool,
}

impl Coordinator {
    pub fn new(assembly: Assembly, config: &CoordinatorConfig) -> Self {
        Self {
            assembly,
            context_probe: config.context_probe,
            max_tool_calls: config.max_tool_calls,
            confirm_mutations: config.confirm_mutations,
        }
    }

    pub fn workers(&self) -> &[Arc<Worker>] {
        &self.assembly.workers
    }

    pub fn routing_hints(&self) -> &[&'static str] {
        &self.assembly.routing_hints
    }

    pub fn worker(&self, name: &str) -> Option<&Arc<Worker>> {
        self.assembly.workers.iter().find(|w| w.name() == name)
    }

    /// Run one operation on a named worker, bypassing the model.
    pub async fn invoke(&self, worker: &str, invocation: Invocation) -> Envelope {
        match self.worker(worker) {
            Some(w) => w.invoke(invocation).await,
            None => Envelope::error(format!("no registered worker named {worker}")),
        }
    }

    /// The worker whose keywords best match `request`; ties go to the earliest registered.
    ///
    /// A request that opens with a memory verb ("remember that ...") belongs to
    /// the memory worker whatever else it mentions.
    pub fn select(&self, request: &str) -> Option<&Arc<Worker>> {
        let tokens = tokenize(request);
        if leads_with_memory_intent(&tokens) {
            if let Some(memory) = self.worker(MEMORY_WORKER) {
                return Some(memory);
            }
        }

        let mut best: Option<(&Arc<Worker>, usize)> = None;

        for worker in &self.assembly.workers {
            let score = keyword_score(worker.keywords(), &tokens);
            if score == 0 {
                continue;
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((worker, score));
            }
        }

        best.map(|(worker, _)| worker)
    }

    pub async fn handle(&self, request: &str, options: RequestOptions) -> Reply {
        tracing::info!(request_len = request.len(), confirmed = options.confirmed, "handling request");

        let context = self.probe_memory(request).await;

        let Some(worker) = self.select(request) else {
            tracing::info!("no capable worker for request");
            return Reply {
                status: ReplyStatus::NoCapableWorker,
                worker: None,
                text: self.no_capable_worker_text(),
                calls: Vec::new(),
            };
        };

        tracing::info!(worker = worker.name(), "delegating request");
        let policy = RunPolicy {
            max_tool_calls: self.max_tool_calls,
            hold_mutations: self.confirm_mutations && !options.confirmed,
        };
        let run = worker.run(request, &context, policy).await;
        synthesize(worker.name(), run)
    }

    /// Advisory context from the memory worker. Failures never block the request.
    async fn probe_memory(&self, request: &str) -> Vec<String> {
        if !self.context_probe || self.worker(MEMORY_WORKER).is_none() {
            return Vec::new();
        }

        let envelope = self
            .invoke(
                MEMORY_WORKER,
                Invocation::new(
                    "query_memory",
                    json!({ "query": request, "include_metadata": false }),
                ),
            )
            .await;

        match envelope {
            Envelope::Records(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            other => {
                if let Some(message) = other.error_message() {
                    tracing::warn!(error = message, "memory probe failed, continuing without context");
                }
                Vec::new()
            }
        }
    }

    fn no_capable_worker_text(&self) -> String {
        if self.assembly.workers.is_empty() {
            return "No capabilities are enabled, so this request cannot be handled.".into();
        }
        format!(
            "None of the enabled capabilities can handle this request. Available: {}.",
            self.assembly.names().join(", ")
        )
    }
}

/// Build the reply for a finished worker run. Error envelopes whose message the
/// model text does not already contain are appended to it.
pub fn synthesize(worker: &'static str, run: WorkerRun) -> Reply {
    let errors: Vec<&CallRecord> = run
        .calls
        .iter()
        .filter(|c| c.status == EnvelopeStatus::Error)
        .collect();
    let held: Vec<&CallRecord> = run
        .calls
        .iter()
        .filter(|c| c.status == EnvelopeStatus::ConfirmationRequired)
        .collect();

    let (mut status, mut text) = match &run.finish {
        Finish::Answered(text) if text.trim().is_empty() => {
            (ReplyStatus::Answered, fallback_text(&run.calls))
        }
        Finish::Answered(text) => (ReplyStatus::Answered, text.trim().to_string()),
        Finish::BudgetExhausted => (
            ReplyStatus::Failed,
            format!(
                "Stopped after {} operations without reaching an answer.",
                run.calls.len()
            ),
        ),
        Finish::ModelFailed(message) => (
            ReplyStatus::Failed,
            format!("The language model could not complete the request: {message}"),
        ),
    };

    for call in &errors {
        let Envelope::Error { message, details } = &call.result else {
            continue;
        };
        if !text.contains(message.as_str()) {
            text.push_str(&format!("\n\nError: {message}"));
            if let Some(details) = details {
                text.push_str(&format!(" ({details})"));
            }
        }
    }

    if !held.is_empty() {
        let operations: Vec<&str> = held.iter().map(|c| c.operation.as_str()).collect();
        text.push_str(&format!(
            "\n\nNot executed without confirmation: {}. Repeat the request with confirmation to proceed.",
            operations.join(", ")
        ));
    }

    if status == ReplyStatus::Answered {
        if !held.is_empty() {
            status = ReplyStatus::AwaitingConfirmation;
        } else if !errors.is_empty() {
            status = ReplyStatus::PartialFailure;
        }
    }

    Reply {
        status,
        worker: Some(worker),
        text,
        calls: run.calls,
    }
}

fn fallback_text(calls: &[CallRecord]) -> String {
    match calls.last() {
        Some(last) => format!("{} returned: {}", last.operation, last.result.to_json_string()),
        None => "The worker returned no answer.".into(),
    }
}

/// Lowercase alphanumeric words of `text`.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn leads_with_memory_intent(tokens: &[String]) -> bool {
    tokens
        .iter()
        .find(|word| !LEADING_FILLER.contains(&word.as_str()))
        .is_some_and(|word| MEMORY_INTENTS.contains(&word.as_str()))
}

/// `word` equals `term` or is a simple plural of it.
fn word_matches(word: &str, term: &str) -> bool {
    word == term
        || word
            .strip_prefix(term)
            .is_some_and(|suffix| suffix == "s" || suffix == "es")
}

/// Sum of matched keyword lengths in words, so phrases outweigh single words.
fn keyword_score(keywords: &[&str], tokens: &[String]) -> usize {
    keywords
        .iter()
        .map(|keyword| {
            let terms: Vec<&str> = keyword.split_whitespace().collect();
            if terms.is_empty() || terms.len() > tokens.len() {
                return 0;
            }
            let hit = tokens.windows(terms.len()).any(|window| {
                window
                    .iter()
                    .zip(&terms)
                    .all(|(word, term)| word_matches(word, term))
            });
            if hit {
                terms.len()
            } else {
                0
            }
        })
        .sum()
}
