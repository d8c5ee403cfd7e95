//! One-shot poll cycle, plus the snapshot rendering shared with `watch`.

use serde::Serialize;
use tabled::Tabled;

use minutly_core::{
    BinaryKind, Coordinator, CoordinatorHealth, DeviceInfo, DeviceSnapshot, Entity, EntityState,
    SensorKind, Snapshot, Tokens,
};

use crate::cli::{GlobalOpts, PollArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Device view ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Temperature")]
    temperature: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Noise")]
    noise: String,
    #[tabled(rename = "Motion")]
    motion: String,
    #[tabled(rename = "Alarm")]
    alarm: String,
}

fn snapshot_row(id: &str, dev: &DeviceSnapshot, color: bool) -> SnapshotRow {
    let flag = |kind| output::paint_state(if dev.is_on(kind) { "on" } else { "off" }, color);
    SnapshotRow {
        id: id.to_owned(),
        name: DeviceInfo::from_device(id, &dev.device).name,
        temperature: output::reading(dev.sensor(SensorKind::Temperature), "°C"),
        humidity: output::reading(dev.sensor(SensorKind::Humidity), "%"),
        noise: output::reading(dev.sensor(SensorKind::Noise), "dBA"),
        motion: flag(BinaryKind::Motion),
        alarm: flag(BinaryKind::Alarm),
    }
}

fn snapshot_table(snapshot: &Snapshot, color: bool) -> String {
    let rows: Vec<SnapshotRow> = snapshot
        .devices
        .iter()
        .map(|(id, dev)| snapshot_row(id, dev, color))
        .collect();
    format!(
        "{}\n{}",
        tabled::Table::new(rows).with(tabled::settings::Style::rounded()),
        snapshot.taken_at.format("taken at %Y-%m-%d %H:%M:%S UTC")
    )
}

// ── Entity view ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct EntityView {
    unique_id: String,
    name: String,
    device_id: String,
    state: EntityState,
    unit: Option<&'static str>,
    device_class: Option<&'static str>,
}

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    name: String,
    #[tabled(rename = "Unique ID")]
    unique_id: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

fn entity_views(snapshot: &Snapshot) -> Vec<EntityView> {
    Entity::for_snapshot(snapshot)
        .into_iter()
        .map(|e| EntityView {
            state: e.state(snapshot),
            name: e.display_name(),
            unique_id: e.unique_id,
            device_id: e.device_id,
            unit: e.description.unit,
            device_class: e.description.device_class,
        })
        .collect()
}

// ── Shared rendering ────────────────────────────────────────────────

/// Render a snapshot per device, or per entity with `entities`.
pub fn render_snapshot(snapshot: &Snapshot, entities: bool, global: &GlobalOpts) -> String {
    let color = output::should_color(&global.color);
    if entities {
        let views = entity_views(snapshot);
        return output::render_list(
            &global.output,
            &views,
            |v| EntityRow {
                name: v.name.clone(),
                unique_id: v.unique_id.clone(),
                state: output::paint_state(&v.state.to_string(), color),
                unit: v.unit.unwrap_or_default().to_owned(),
            },
            |v| format!("{} {}", v.unique_id, v.state),
        );
    }
    output::render_single(
        &global.output,
        snapshot,
        |s| snapshot_table(s, color),
        |s| s.devices.keys().cloned().collect::<Vec<_>>().join("\n"),
    )
}

/// One-line health summary for stderr.
pub fn describe_health(health: &CoordinatorHealth, color: bool) -> String {
    match health {
        CoordinatorHealth::Pending => "pending".into(),
        CoordinatorHealth::Healthy => output::paint_ok("healthy", color),
        CoordinatorHealth::Unavailable { reason } => {
            output::paint_warn(&format!("unavailable: {reason}"), color)
        }
        CoordinatorHealth::RateLimited { retry_after_secs } => output::paint_warn(
            &retry_after_secs.map_or_else(
                || "rate limited".into(),
                |s| format!("rate limited, retry after {s}s"),
            ),
            color,
        ),
        CoordinatorHealth::ReauthRequired { message } => {
            output::paint_warn(&format!("re-authentication required: {message}"), color)
        }
    }
}

/// Persist tokens the coordinator rotated since `coordinator` was built.
pub fn persist_if_rotated(session: &Session, coordinator: &Coordinator, initial: &Tokens) {
    let current = coordinator.current_tokens();
    if !current.same_access_token(initial) {
        util::persist_tokens(&session.profile_name, &current);
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: PollArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tokens = util::login(session).await?;
    let coordinator = Coordinator::new(
        session.client.clone(),
        tokens.clone(),
        session.coordinator.clone(),
    );

    let result = coordinator.first_refresh().await;
    persist_if_rotated(session, &coordinator, &tokens);
    let snapshot = result.map_err(|e| CliError::from(e).for_profile(&session.profile_name))?;

    let out = render_snapshot(&snapshot, args.entities, global);
    output::print_output(&out, global.quiet);
    Ok(())
}
