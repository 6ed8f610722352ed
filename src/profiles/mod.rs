//! Worker and business profiles

pub mod business;
pub mod portfolio;
pub mod worker;

pub use business::{BusinessDashboard, BusinessOnboarding, BusinessProfiles};
pub use portfolio::{Portfolio, PortfolioInput};
pub use worker::{WorkerOnboarding, WorkerProfileUpdate, WorkerProfileView, WorkerProfiles};
