//! Spotify OAuth constants
//!
//! Endpoint and scope defaults for the authorization-code flow. The client
//! id/secret come from the user's config file; these values only identify
//! where to send them.

/// Authorization endpoint the user's browser is sent to
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Loopback redirect registered for the application in the Spotify dashboard
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

/// Scopes needed to search the catalog and drive playback.
pub const SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-modify-playback-state",
    "user-read-playback-state",
];

/// How long the callback listener stays up after resolving, so the
/// browser receives the success page before the socket closes.
pub const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(1);
