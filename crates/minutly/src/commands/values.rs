//! Latest-reading command handler.

use serde::Serialize;

use minutly_core::{ENTITY_DESCRIPTIONS, EntityKind, LatestValues};

use crate::cli::{GlobalOpts, ValuesArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct ValuesView {
    device_id: String,
    #[serde(flatten)]
    values: LatestValues,
}

fn detail(v: &ValuesView) -> String {
    let mut lines = vec![format!("Device:      {}", v.device_id)];
    for desc in ENTITY_DESCRIPTIONS {
        if let EntityKind::Sensor(kind) = desc.kind {
            let label = format!("{}:", desc.name);
            lines.push(format!(
                "{label:<12} {}",
                output::reading(v.values.get(kind), desc.unit.unwrap_or_default())
            ));
        }
    }
    lines.join("\n")
}

fn plain(v: &ValuesView) -> String {
    [v.values.temperature, v.values.humidity, v.values.noise]
        .iter()
        .map(|r| r.map_or_else(|| "-".into(), |x| x.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn handle(session: &Session, args: ValuesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = util::connect(session).await?;
    util::find_device(&outcome.devices, &args.device)?;

    let values = session
        .client
        .get_latest_values(&outcome.tokens, &args.device)
        .await?;

    let view = ValuesView {
        device_id: args.device,
        values,
    };
    let out = output::render_single(&global.output, &view, detail, plain);
    output::print_output(&out, global.quiet);
    Ok(())
}
