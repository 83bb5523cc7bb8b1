//! Read-only commands: `latest` and `history`.

use shiplane_core::ShiplaneConfig;
use shiplane_ledger::Ledger;
use shiplane_registry::{HttpRegistry, RetryPolicy, latest_dev_tag, with_retry};

use crate::Cli;
use crate::exit;

/// Print the latest dev tag. Talks only to the registry.
pub async fn latest(cli: &Cli, repo: &str) -> anyhow::Result<u8> {
    let config = ShiplaneConfig::load(cli.config_path())?;
    let registry = HttpRegistry::new(&config.registry);
    let retry = RetryPolicy::from_config(&config.registry);

    let tag = with_retry("resolve latest dev tag", retry, || {
        latest_dev_tag(&registry, repo)
    })
    .await
    .map_err(shiplane_pipeline::PipelineError::Registry)?;

    println!("{tag}");
    Ok(exit::SUCCESS)
}

/// Print promotion history from the local ledger.
pub fn history(cli: &Cli, repo: &str, format: &str) -> anyhow::Result<u8> {
    let ledger = Ledger::open(cli.ledger_path())?;
    let records = ledger.list_for_repo(repo)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => {
            if records.is_empty() {
                println!("no promotions recorded for {repo}");
            }
            for r in &records {
                println!(
                    "{}  {} -> {}  {:?}  {}",
                    r.promoted_at, r.source_tag, r.stable_tag, r.outcome, r.digest
                );
            }
        }
    }
    Ok(exit::SUCCESS)
}
