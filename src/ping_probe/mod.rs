pub mod parse;
pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::parse::parse_ping_output;
    pub use super::probe::PingProber;
    pub use super::result::PingResult;
}
