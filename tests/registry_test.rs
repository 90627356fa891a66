mod helpers;

use std::sync::Arc;

use eternium::envelope::Envelope;
use eternium::registry::{assemble, Blueprint, BuildContext, BLUEPRINTS};
use eternium::tool::{operation, NoParams, OperationSpec, Toolset};
use helpers::{context, set_enabled, test_config, FakeRunner, ScriptedModel, StubEmbedder};

const PING: OperationSpec = OperationSpec::read("ping", "Reply with pong.");

fn ping_toolset(_: &BuildContext) -> anyhow::Result<Toolset> {
    Ok(vec![operation(PING, |_: NoParams| async {
        Ok::<_, eternium::adapters::AdapterError>(Envelope::success("pong"))
    })])
}

fn broken_toolset(_: &BuildContext) -> anyhow::Result<Toolset> {
    anyhow::bail!("backend credentials missing")
}

fn blueprint(name: &'static str, construct: eternium::registry::Factory) -> Blueprint {
    Blueprint {
        name,
        agent: "test_agent",
        routing_hint: name,
        keywords: &[],
        construct,
    }
}

fn test_context(config: eternium::config::EterniumConfig) -> BuildContext {
    context(
        config,
        Arc::new(ScriptedModel::new()),
        Arc::new(FakeRunner::new()),
        Arc::new(StubEmbedder::new()),
    )
}

#[test]
fn disabled_and_failing_capabilities_are_absent() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    // harbor has no URL configured, so its factory fails
    for name in ["harbor", "helm", "memory", "prometheus"] {
        set_enabled(&mut config, name, true);
    }

    let ctx = test_context(config.clone());
    let assembly = assemble(BLUEPRINTS, &ctx, |name| config.capabilities.is_enabled(name));

    assert_eq!(assembly.names(), vec!["helm", "memory", "prometheus"]);

    let expected_hints: Vec<&str> = BLUEPRINTS
        .iter()
        .filter(|b| ["helm", "memory", "prometheus"].contains(&b.name))
        .map(|b| b.routing_hint)
        .collect();
    assert_eq!(assembly.routing_hints, expected_hints);
    assert!(!assembly.delegation_rules().contains("harbor_agent"));
}

#[test]
fn failing_factory_does_not_stop_later_entries() {
    let tmp = tempfile::TempDir::new().unwrap();
    let ctx = test_context(test_config(&tmp));
    let table = [
        blueprint("first", ping_toolset),
        blueprint("broken", broken_toolset),
        blueprint("last", ping_toolset),
    ];

    let assembly = assemble(&table, &ctx, |_| true);

    assert_eq!(assembly.names(), vec!["first", "last"]);
    assert_eq!(assembly.routing_hints, vec!["first", "last"]);
}

#[test]
fn duplicate_names_keep_the_first_entry() {
    let tmp = tempfile::TempDir::new().unwrap();
    let ctx = test_context(test_config(&tmp));
    let table = [
        blueprint("ping", ping_toolset),
        blueprint("ping", broken_toolset),
    ];

    let assembly = assemble(&table, &ctx, |_| true);
    assert_eq!(assembly.names(), vec!["ping"]);
    assert_eq!(assembly.workers[0].tools().len(), 1);
}

#[test]
fn nothing_enabled_is_an_empty_assembly() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = test_config(&tmp);
    let ctx = test_context(config.clone());

    let assembly = assemble(BLUEPRINTS, &ctx, |name| config.capabilities.is_enabled(name));
    assert!(assembly.workers.is_empty());
    assert!(assembly.routing_hints.is_empty());
}

// the MySQL pool spawns its maintenance task on the current runtime
#[tokio::test]
async fn every_capability_assembles_when_configured() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    for b in BLUEPRINTS {
        set_enabled(&mut config, b.name, true);
    }
    config.harbor.url = Some("https://harbor.lab.local".into());
    config.kubernetes.api_url = Some("https://10.0.0.1:6443".into());
    config.kubernetes.token = Some("token".into());
    config.mysql.host = Some("127.0.0.1".into());

    let ctx = test_context(config);
    let assembly = assemble(BLUEPRINTS, &ctx, |_| true);

    let expected: Vec<&str> = BLUEPRINTS.iter().map(|b| b.name).collect();
    assert_eq!(assembly.names(), expected);
}
