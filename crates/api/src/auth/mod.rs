pub mod credentials;
pub mod middleware;
pub mod session_table;
pub mod totp;

mod tokens;

pub use credentials::Sha256Verifier;
pub use middleware::{AuthContext, AuthVerdict};
pub use session_table::SessionTable;
