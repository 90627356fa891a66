use anyhow::Result;

use crate::config::EterniumConfig;
use crate::tool::Effect;

/// Print the enabled capabilities and their operations.
pub fn capabilities(config: EterniumConfig) -> Result<()> {
    let coordinator = crate::server::build_coordinator(config)?;

    if coordinator.workers().is_empty() {
        println!("No capabilities are enabled.");
        return Ok(());
    }

    for worker in coordinator.workers() {
        println!("{} ({})", worker.name(), worker.agent());
        println!("  {}", worker.routing_hint());
        for tool in worker.tools() {
            let marker = match tool.effect() {
                Effect::Mutating => " [mutating]",
                Effect::Read => "",
            };
            println!("    - {}{marker}: {}", tool.name(), tool.spec().description);
        }
        println!();
    }
    Ok(())
}
