// Device listing

use tracing::debug;

use crate::auth::Tokens;
use crate::client::MinutClient;
use crate::error::Error;
use crate::models::{Device, devices_from_body};

impl MinutClient {
    /// List every device on the account.
    ///
    /// Accepts a bare array or `{"devices": [...]}`. An empty list is a
    /// valid result.
    pub async fn get_devices(&self, tokens: &Tokens) -> Result<Vec<Device>, Error> {
        let url = self.endpoints().devices_url()?;
        let body = self.get_json(url.clone(), &[], tokens).await?;

        let devices = devices_from_body(body).ok_or_else(|| Error::UnexpectedShape {
            endpoint: url.path().to_owned(),
        })?;
        debug!(count = devices.len(), "device list loaded");
        Ok(devices)
    }
}
