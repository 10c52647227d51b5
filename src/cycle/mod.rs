pub mod measurement;
pub mod scheduler;

pub use measurement::{Measurement, Payload};
pub use scheduler::{CycleError, CycleScheduler, DnsProbe, HttpProbe, PingProbe};
