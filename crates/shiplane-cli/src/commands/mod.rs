pub mod deploy;
pub mod query;

use std::sync::Arc;

use shiplane_core::ShiplaneConfig;
use shiplane_ledger::Ledger;
use shiplane_pipeline::Pipeline;
use shiplane_registry::HttpRegistry;
use shiplane_rollout::HttpOrchestrator;

use crate::Cli;

/// Load config and wire the pipeline against the real HTTP backends.
pub fn build_pipeline(cli: &Cli) -> anyhow::Result<Pipeline> {
    let config = ShiplaneConfig::load(cli.config_path())?;
    let registry = Arc::new(HttpRegistry::new(&config.registry));
    let orchestrator = Arc::new(HttpOrchestrator::new(&config.orchestrator));
    let ledger = Ledger::open(cli.ledger_path())?;
    Ok(Pipeline::new(registry, orchestrator, ledger, config))
}
