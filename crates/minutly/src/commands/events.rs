//! Timeline command handler.

use chrono::TimeDelta;
use tabled::Tabled;

use minutly_api::TimelineEvent;

use crate::cli::{EventsArgs, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Type")]
    event_type: String,
}

impl From<&TimelineEvent> for EventRow {
    fn from(e: &TimelineEvent) -> Self {
        Self {
            time: e.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            device: e.device_id.clone(),
            event_type: e.event_type.clone(),
        }
    }
}

pub async fn handle(session: &Session, args: EventsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let within = match args.within {
        Some(d) => TimeDelta::from_std(d).map_err(|_| CliError::Validation {
            field: "within".into(),
            reason: "duration is out of range".into(),
        })?,
        None => session.coordinator.event_window,
    };

    let outcome = util::connect(session).await?;
    let mut events = if let Some(ref device) = args.device {
        util::find_device(&outcome.devices, device)?;
        session
            .client
            .get_recent_events(&outcome.tokens, device, within)
            .await?
    } else {
        session
            .client
            .get_account_events(&outcome.tokens, within)
            .await?
    };
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let out = output::render_list(
        &global.output,
        &events,
        |e| EventRow::from(e),
        |e| e.event_type.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
