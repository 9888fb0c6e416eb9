//! Google collaborators: OAuth handshake, Management API listing and the
//! Reporting API.

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod management;
pub mod oauth;
pub mod reporting;

pub use error::{GatewayError, GatewayResult};
pub use gateway::AnalyticsGateway;
pub use management::RestClient;
pub use oauth::OAuthFlow;
pub use reporting::{ActiveVisitorsQuery, ProfileReporter, Report, ReporterError};

/// Resource owner name applications are registered under.
pub const RESOURCE_OWNER: &str = "Google";
