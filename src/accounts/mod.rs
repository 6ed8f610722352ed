//! Accounts, credentials and sessions

pub mod password;
pub mod registry;
pub mod session;

pub use registry::{AccountRegistry, RegisterRequest};
pub use session::{Claims, SessionKeys};
