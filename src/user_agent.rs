//! Shared User-Agent string for catalog and artwork HTTP traffic.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/tunefetch";

/// Default User-Agent for catalog requests (identifies the tool).
#[must_use]
pub(crate) fn default_catalog_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("tunefetch/{version} (+{PROJECT_UA_URL})")
}
