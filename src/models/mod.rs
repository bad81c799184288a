pub mod config;
pub mod cursor;
pub mod identity;
pub mod recipient;

pub use config::{
    AppConfig, DispatchSettings, PacingConfig, ProbeSettings, ProxyFileConfig, ScheduleConfig,
    ServerConfig, TemplateSelection, TransportConfig,
};
pub use cursor::RotationCursor;
pub use identity::{Credentials, HealthStatus, Identity};
pub use recipient::{DeliveryStatus, Recipient};
