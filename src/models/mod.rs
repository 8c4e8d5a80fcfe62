pub mod application;
pub mod assessment;
pub mod candidate;
pub mod job_role;
pub mod technical;
pub mod user;
