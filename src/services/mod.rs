pub mod admin_service;
pub mod api_client;
pub mod application_service;
pub mod candidate_service;
pub mod data_client;
pub mod job_service;
pub mod notification_service;
pub mod storage_service;
pub mod technical_service;
