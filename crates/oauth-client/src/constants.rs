//! OAuth defaults
//!
//! Endpoint and scope defaults for the conversation-state platform. Client
//! id and secret have no defaults; they must come from configuration.

use std::time::Duration;

/// Token endpoint for the client-credentials exchange
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth.api.dev-godaddy.com/v2/oauth2/token";

/// Scope requested when none is configured (read access to the care data plane)
pub const DEFAULT_SCOPE: &str = "care.dataplane.read:all";

/// Lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(3600);

/// A cached token is treated as expired this long before its real expiry.
pub const SAFETY_MARGIN: Duration = Duration::from_secs(300);

/// Longest lifetime accepted from the token endpoint; larger `expires_in`
/// values are clamped to this.
pub const MAX_EXPIRES_IN: Duration = Duration::from_secs(24 * 3600);
