pub mod core;
pub mod ports;
pub mod use_cases;

pub use self::core::{Core, Verdict};
