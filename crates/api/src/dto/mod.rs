mod auth;
mod query;
mod stats;

pub use auth::*;
pub use query::*;
pub use stats::*;
