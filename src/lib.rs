pub mod accounts;
pub mod api;
pub mod applications;
pub mod catalog;
pub mod config;
pub mod contracts;
pub mod database;
pub mod email;
pub mod error;
pub mod jobs;
pub mod lenient;
pub mod messaging;
pub mod notifications;
pub mod profiles;
pub mod storage;

pub use error::MarketplaceError;
