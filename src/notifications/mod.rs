//! In-app notifications
//!
//! Rows are written by the other modules as side effects (new application,
//! status change, message) and read back through `NotificationCenter`.

pub mod center;

pub use center::{NewNotification, NotificationCenter, NotificationPage};
