//! Continuous polling until interrupted or `--count` snapshots were shown.

use minutly_core::Coordinator;
use tracing::info;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::{poll, util};

pub async fn handle(session: &Session, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = session.coordinator.clone();
    if let Some(interval) = args.interval {
        config.scan_interval = interval;
    }
    if config.scan_interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let tokens = util::login(session).await?;
    let coordinator = Coordinator::new(session.client.clone(), tokens, config);

    let mut token_rx = coordinator.tokens();
    let mut snapshot_rx = coordinator.snapshots();
    let mut health_rx = coordinator.health();

    let first = coordinator
        .start()
        .await
        .map_err(|e| CliError::from(e).for_profile(&session.profile_name))?;
    // Already rendered below; only later publications count as changes.
    snapshot_rx.mark_unchanged();
    health_rx.mark_unchanged();

    let color = output::should_color(&global.color);
    output::print_output(&poll::render_snapshot(&first, args.entities, global), global.quiet);
    let mut shown = 1_u32;

    info!(interval = ?coordinator.config().scan_interval, "watching");
    while args.count.is_none_or(|n| shown < n) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = snapshot_rx.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    output::print_output(
                        &poll::render_snapshot(&snapshot, args.entities, global),
                        global.quiet,
                    );
                    shown += 1;
                }
            }
            changed = health_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let health = health_rx.borrow_and_update().clone();
                if !health.is_healthy() {
                    eprintln!("{}", poll::describe_health(&health, color));
                }
            }
            changed = token_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let rotated = token_rx.borrow_and_update().clone();
                util::persist_tokens(&session.profile_name, &rotated);
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}
