pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::probe::DnsProber;
    pub use super::result::{DnsOutcome, DnsResult};
}
