pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::probe::HttpProber;
    pub use super::result::{HttpOutcome, HttpResult};
}
