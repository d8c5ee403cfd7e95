// Timeline events
//
// Per-device and account-wide feeds. The timeline is advisory: a missing
// endpoint or a network failure yields an empty list so a poll cycle
// never aborts on it.

use chrono::{TimeDelta, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Tokens;
use crate::client::MinutClient;
use crate::error::Error;
use crate::models::{TimelineEvent, events_from_body, retain_recent};

/// Default recency window for timeline events, in seconds.
pub const DEFAULT_EVENT_WINDOW_SECS: i64 = 120;

/// Default recency window for timeline events.
pub fn default_event_window() -> TimeDelta {
    TimeDelta::seconds(DEFAULT_EVENT_WINDOW_SECS)
}

impl MinutClient {
    /// Events for one device whose age is at most `within`.
    ///
    /// Every event is attributed to `device_id`, even when the entry embeds
    /// a different id such as a hardware serial.
    pub async fn get_recent_events(
        &self,
        tokens: &Tokens,
        device_id: &str,
        within: TimeDelta,
    ) -> Result<Vec<TimelineEvent>, Error> {
        let url = self.endpoints().device_timeline_url(device_id)?;
        let limit = self.config().timeline_limit;
        let raw = self.fetch_timeline(url, limit, tokens).await?;

        let events = raw
            .iter()
            .filter_map(|item| TimelineEvent::from_raw(item, Some(device_id)));
        Ok(retain_recent(events, Utc::now(), within))
    }

    /// Events across every device on the account whose age is at most
    /// `within`. Entries without a device id are dropped.
    pub async fn get_account_events(
        &self,
        tokens: &Tokens,
        within: TimeDelta,
    ) -> Result<Vec<TimelineEvent>, Error> {
        let url = self.endpoints().account_timeline_url()?;
        let limit = self.config().account_timeline_limit;
        let raw = self.fetch_timeline(url, limit, tokens).await?;

        let events = raw
            .iter()
            .filter_map(|item| TimelineEvent::from_raw(item, None));
        Ok(retain_recent(events, Utc::now(), within))
    }

    async fn fetch_timeline(
        &self,
        url: Url,
        limit: u32,
        tokens: &Tokens,
    ) -> Result<Vec<Value>, Error> {
        let params = [("limit", limit.to_string())];
        match self.get_json(url.clone(), &params, tokens).await {
            Ok(body) => Ok(events_from_body(body)),
            Err(e) if e.is_not_found() => {
                debug!("timeline not available at {}", url.path());
                Ok(Vec::new())
            }
            Err(e) if e.is_network_failure() => {
                warn!(error = %e, "timeline fetch failed, treating as empty");
                Ok(Vec::new())
            }
            Err(Error::Deserialization { message, .. }) => {
                debug!("unparseable timeline body: {message}");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
