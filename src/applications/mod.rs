//! Job applications and the hiring pipeline

pub mod lifecycle;
pub mod manager;

pub use manager::{
    Applicant, ApplicationManager, ApplicationWithJob, ApplicationWithWorker, ApplyInput,
};
