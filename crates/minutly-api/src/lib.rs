// minutly-api: Async Rust client for the Minut Point dashboard API
//
// Stateless over tokens: every authenticated call takes a `Tokens` value
// and token grants return a new one. Errors carry a coarse classification
// (`ErrorKind`) so callers can tell re-authentication apart from backoff.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod transport;

mod devices;
mod login;
mod timeline;
mod values;

pub use auth::Tokens;
pub use client::{ClientConfig, MinutClient};
pub use endpoints::Endpoints;
pub use error::{Error, ErrorKind};
pub use models::{Device, LatestValues, SensorKind, TimelineEvent};
pub use timeline::{DEFAULT_EVENT_WINDOW_SECS, default_event_window};
pub use transport::TransportConfig;
