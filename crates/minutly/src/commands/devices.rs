//! Device command handler.

use tabled::Tabled;

use minutly_core::{Device, DeviceInfo};

use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        let id = d.id().unwrap_or_else(|| "-".into());
        let info = DeviceInfo::from_device(&id, d);
        Self {
            id,
            name: info.name,
            model: info.model,
        }
    }
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = util::connect(session).await?;
    let out = output::render_list(
        &global.output,
        &outcome.devices,
        |d| DeviceRow::from(d),
        |d| d.id().unwrap_or_default(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
