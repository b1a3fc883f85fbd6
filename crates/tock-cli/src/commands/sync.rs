use tock_core::sync::{SyncOutcome, SyncTrigger};

use crate::commands::common::{format_local_time, AppContext};
use crate::error::CliError;

pub async fn run_sync(push_only: bool, pull_only: bool, ctx: &AppContext) -> Result<(), CliError> {
    let engine = ctx.engine()?;

    if push_only || pull_only {
        let report = if push_only {
            engine.push().await?
        } else {
            engine.pull().await?
        };
        match report {
            Some(report) => println!("{report}"),
            None => println!("Offline or a sync is already running; nothing to do."),
        }
        return Ok(());
    }

    match engine.sync(SyncTrigger::Manual).await? {
        SyncOutcome::Completed(summary) => {
            println!("{}", summary.push);
            println!("{}", summary.pull);
            println!("Sync completed at {}", format_local_time(summary.finished_at));
        }
        SyncOutcome::Offline => println!("Offline; changes stay local until the next sync."),
        SyncOutcome::Coalesced => println!("A sync is already running."),
    }
    Ok(())
}
