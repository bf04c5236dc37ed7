//! Jobs: named flows with a restart policy, plus the launcher and the
//! repository that remembers past runs.

mod builder;
mod definition;
mod execution;
mod launcher;
mod repository;

pub use builder::JobBuilder;
pub use definition::Job;
pub use execution::{instance_key, JobExecution};
pub use launcher::JobLauncher;
pub use repository::{check_restart, InMemoryJobRepository, JobRepository};
