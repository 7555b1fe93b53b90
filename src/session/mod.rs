mod analysis;
mod capture;
mod runner;
mod signals;
mod summary;


pub use runner::Session;
pub use summary::{SessionSummary, StopReason};
