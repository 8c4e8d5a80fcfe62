pub mod admin_dto;
pub mod application_dto;
pub mod candidate_dto;
pub mod job_dto;
pub mod storage_dto;
