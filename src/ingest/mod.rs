pub mod client;

pub use client::{ReportError, Reporter};
