// ABOUTME: Validated domain types shared across the controller.
// ABOUTME: Environment identifiers, remote addresses, service names and health URLs.

mod address;
mod environment_id;
mod health_url;
mod service_name;

pub use address::{AddressError, RemoteAddress};
pub use environment_id::{EnvironmentId, UnknownEnvironment};
pub use health_url::{HealthUrl, HealthUrlError};
pub use service_name::{ServiceName, ServiceNameError};
