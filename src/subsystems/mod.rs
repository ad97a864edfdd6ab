pub mod comms;
pub mod runtime;
#[cfg(feature = "subsystem-scheduler")]
pub mod scheduler;
