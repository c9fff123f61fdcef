use std::time::Duration;

use pulse_api_types::Collection;
use pulse_client::scheduler::{RefreshPolicy, RefreshScheduler, Snapshot};
use tracing::info;

use super::AppContext;

const DEFAULT_COLLECTIONS: [Collection; 2] = [Collection::Campaigns, Collection::Metrics];

/// Run the `watch` subcommand: poll collections in the background and print
/// a line per applied update until Ctrl-C or `updates` lines.
pub async fn run(
    ctx: &AppContext,
    collections: Vec<Collection>,
    updates: Option<usize>,
    interval_secs: Option<u64>,
) -> anyhow::Result<()> {
    let collections = if collections.is_empty() {
        DEFAULT_COLLECTIONS.to_vec()
    } else {
        collections
    };

    let service = ctx.service()?;
    let scheduler = RefreshScheduler::new(service);
    let (tx, rx) = flume::unbounded();
    for &collection in &collections {
        if let Some(secs) = interval_secs {
            let retry = scheduler.policy(collection).retry;
            scheduler.set_policy(
                collection,
                RefreshPolicy::every(Duration::from_secs(secs.max(1))).with_retry(retry),
            );
        }
        let tx = tx.clone();
        scheduler.on_update(collection, move |snapshot| {
            let _ = tx.send(snapshot);
        });
    }
    drop(tx);

    for &collection in &collections {
        scheduler.start(collection);
    }
    info!(count = collections.len(), "watching collections");

    let mut seen = 0usize;
    loop {
        tokio::select! {
            msg = rx.recv_async() => {
                let Ok(snapshot) = msg else { break };
                println!("{}", describe(&snapshot));
                seen += 1;
                if updates.is_some_and(|n| seen >= n) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scheduler.shutdown();
    Ok(())
}

fn describe(snapshot: &Snapshot) -> String {
    let time = snapshot
        .fetched_at
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S");
    format!(
        "[{time}] {:<12} #{:<4} {:>3} record(s)  ({})",
        snapshot.collection.as_str(),
        snapshot.seq,
        snapshot.data.len(),
        snapshot.origin
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::mock_context;
    use super::*;

    #[tokio::test]
    async fn stops_after_requested_updates() {
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            run(&mock_context(), vec![Collection::Metrics, Collection::MockStatus], Some(2), None),
        )
        .await
        .expect("watch finishes");
        assert!(result.is_ok());
    }
}
