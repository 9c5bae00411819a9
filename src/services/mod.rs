pub mod registration_service;
pub mod status_service;

pub use registration_service::{RegistrationService, SubscribeOutcome};
pub use status_service::{StatusObserver, query_status};
