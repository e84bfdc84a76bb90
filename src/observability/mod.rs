//! Observability for the cities service
//!
//! Structured JSON logging driven by a closed set of typed events.
//!
//! ```ignore
//! use cities_service::observability::{Event, Logger};
//!
//! Logger::event(Event::CitiesRequest, &[("backend", "mongo"), ("method", "GET")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event) {
    Logger::event(event, &[]);
}
