// Endpoint configuration
//
// The draft API is undocumented and reverse-engineered, so every path is
// data rather than code. Templates use `{device_id}` as the only placeholder.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::models::SensorKind;

pub const DEFAULT_BASE_URL: &str = "https://api.minut.com";

const DEVICE_PLACEHOLDER: &str = "{device_id}";

/// Paths of every vendor endpoint the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub base_url: Url,
    /// OAuth2 token endpoint (password and refresh grants).
    pub token_path: String,
    pub devices_path: String,
    /// Per-device timeline.
    pub device_timeline_path: String,
    /// Account-wide timeline covering every device.
    pub account_timeline_path: String,
    pub temperature_path: String,
    pub humidity_path: String,
    /// Noise is served as average sound levels.
    pub noise_path: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        // DEFAULT_BASE_URL is a constant, parse cannot fail.
        #[allow(clippy::expect_used)]
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid");
        Self::with_base_url(base_url)
    }
}

impl Endpoints {
    /// Default draft1 dashboard paths rooted at `base_url`.
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            token_path: "/v1/oauth/token".into(),
            devices_path: "/draft1/devices".into(),
            device_timeline_path: "/draft1/device/{device_id}/timeline".into(),
            account_timeline_path: "/draft1/timelines/me".into(),
            temperature_path: "/draft1/device/{device_id}/temperature/values".into(),
            humidity_path: "/draft1/device/{device_id}/humidity/values".into(),
            noise_path: "/draft1/device/{device_id}/sound/avg_levels".into(),
        }
    }

    pub fn token_url(&self) -> Result<Url, Error> {
        self.resolve(&self.token_path, None)
    }

    pub fn devices_url(&self) -> Result<Url, Error> {
        self.resolve(&self.devices_path, None)
    }

    pub fn device_timeline_url(&self, device_id: &str) -> Result<Url, Error> {
        self.resolve(&self.device_timeline_path, Some(device_id))
    }

    pub fn account_timeline_url(&self) -> Result<Url, Error> {
        self.resolve(&self.account_timeline_path, None)
    }

    pub fn sensor_url(&self, kind: SensorKind, device_id: &str) -> Result<Url, Error> {
        let template = match kind {
            SensorKind::Temperature => &self.temperature_path,
            SensorKind::Humidity => &self.humidity_path,
            SensorKind::Noise => &self.noise_path,
        };
        self.resolve(template, Some(device_id))
    }

    /// Append the template's segments to the base URL. The device id is
    /// substituted per segment, so `/`, `?` and `#` in it are escaped.
    fn resolve(&self, template: &str, device_id: Option<&str>) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty();
            for part in template.split('/').filter(|p| !p.is_empty()) {
                match device_id {
                    Some(id) => segments.push(&part.replace(DEVICE_PLACEHOLDER, id)),
                    None => segments.push(part),
                };
            }
        }
        Ok(url)
    }
}
