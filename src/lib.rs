//! Eternium: a homelab operations agency.
//!
//! A natural-language request is routed by the [`coordinator`] to exactly one
//! worker, chosen from the capabilities the [`registry`] assembled at boot.
//! Each worker wraps one backend:
//!
//! | Capability | Backend | Transport |
//! |------------|---------|-----------|
//! | **kubernetes** | Kubernetes API | HTTPS (`reqwest`) |
//! | **harbor** | Harbor v2 registry | HTTPS (`reqwest`) |
//! | **helm** | `helm` CLI | subprocess |
//! | **docker** | `docker` CLI | subprocess |
//! | **mysql** | MySQL server | `sqlx` pool, `mysqldump` |
//! | **prometheus** | Prometheus HTTP API | HTTPS (`reqwest`) |
//! | **memory** | SQLite + sqlite-vec | in process |
//!
//! Every operation answers with an [`envelope::Envelope`]; backend failures
//! become error envelopes instead of propagating.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`registry`]: blueprint table and boot-time assembly
//! - [`coordinator`]: routing, context probe and answer synthesis
//! - [`worker`]: per-capability tool loop against the model runtime
//! - [`tool`]: the operation interface and typed wrappers
//! - [`adapters`]: one module per backend
//! - [`memory`]: semantic memory store
//! - [`server`]: HTTP API and MCP transports

pub mod adapters;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod embedding;
pub mod envelope;
pub mod llm;
pub mod memory;
pub mod registry;
pub mod server;
pub mod tool;
pub mod tools;
pub mod worker;
