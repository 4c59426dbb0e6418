pub mod validate;
pub mod writer;

pub use validate::validate_reports;
pub use writer::{synthesize, write_all};
