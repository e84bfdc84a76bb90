//! Observable events
//!
//! Every log line names one of these events. Events are explicit and typed
//! so that log consumers can match on a closed vocabulary.

use std::fmt;

use super::logger::Severity;

/// Observable events in the cities service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Startup begins
    StartupBegin,
    /// Configuration resolved and validated
    ConfigLoaded,
    /// Document store client built
    DocumentStoreConnected,
    /// Relational pool opened and its first liveness check passed
    RelationalStoreConnected,
    /// Relational store intentionally left unconfigured
    RelationalStoreDisabled,
    /// Relational store failed its startup liveness check (FATAL)
    RelationalStoreUnreachable,
    /// Listener bound, accepting requests
    Serving,

    // Requests
    /// A cities endpoint was called
    CitiesRequest,
    /// A request was answered with an error
    RequestFailed,
    /// A stored document could not be decoded and was left out of a listing
    DocumentDecodeSkipped,
    /// A relational row was inserted
    CityInserted,

    // Check command
    /// A backend answered its liveness check
    BackendHealthy,
    /// A backend failed its liveness check
    BackendUnhealthy,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StartupBegin => "SERVICE_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DocumentStoreConnected => "DOCUMENT_STORE_CONNECTED",
            Event::RelationalStoreConnected => "RELATIONAL_STORE_CONNECTED",
            Event::RelationalStoreDisabled => "RELATIONAL_STORE_DISABLED",
            Event::RelationalStoreUnreachable => "RELATIONAL_STORE_UNREACHABLE",
            Event::Serving => "SERVICE_SERVING",

            Event::CitiesRequest => "CITIES_REQUEST",
            Event::RequestFailed => "REQUEST_FAILED",
            Event::DocumentDecodeSkipped => "DOCUMENT_DECODE_SKIPPED",
            Event::CityInserted => "CITY_INSERTED",

            Event::BackendHealthy => "BACKEND_HEALTHY",
            Event::BackendUnhealthy => "BACKEND_UNHEALTHY",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RelationalStoreUnreachable => Severity::Fatal,
            Event::RequestFailed | Event::BackendUnhealthy => Severity::Error,
            Event::DocumentDecodeSkipped | Event::RelationalStoreDisabled => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
