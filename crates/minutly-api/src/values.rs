// Latest sensor values
//
// One request per sensor kind. Kinds degrade to "absent" independently:
// a missing endpoint or a flaky connection on one kind never hides the
// readings of the others. Auth, rate-limit and server errors still abort.

use tracing::{debug, warn};

use crate::auth::Tokens;
use crate::client::MinutClient;
use crate::error::Error;
use crate::models::{LatestValues, SensorKind, latest_value_from_body};

impl MinutClient {
    /// Fetch the most recent reading of every sensor kind for a device.
    pub async fn get_latest_values(
        &self,
        tokens: &Tokens,
        device_id: &str,
    ) -> Result<LatestValues, Error> {
        let (temperature, humidity, noise) = tokio::join!(
            self.get_latest_value(tokens, device_id, SensorKind::Temperature),
            self.get_latest_value(tokens, device_id, SensorKind::Humidity),
            self.get_latest_value(tokens, device_id, SensorKind::Noise),
        );

        Ok(LatestValues {
            temperature: temperature?,
            humidity: humidity?,
            noise: noise?,
        })
    }

    /// Fetch the latest reading of one sensor kind. `Ok(None)` when the
    /// kind is unavailable for this device.
    pub async fn get_latest_value(
        &self,
        tokens: &Tokens,
        device_id: &str,
        kind: SensorKind,
    ) -> Result<Option<f64>, Error> {
        let url = self.endpoints().sensor_url(kind, device_id)?;
        let params = [("limit", "1".to_owned())];

        match self.get_json(url, &params, tokens).await {
            Ok(body) => {
                let value = latest_value_from_body(&body);
                if value.is_none() {
                    debug!(device_id, %kind, "no usable reading in response");
                }
                Ok(value)
            }
            Err(e) if e.is_not_found() => {
                debug!(device_id, %kind, "sensor not available");
                Ok(None)
            }
            Err(e) if e.is_network_failure() => {
                warn!(device_id, %kind, error = %e, "sensor fetch failed, treating as absent");
                Ok(None)
            }
            Err(Error::Deserialization { message, .. }) => {
                debug!(device_id, %kind, "unparseable sensor body: {message}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
