pub mod flash_service;
pub mod upload_service;
