pub mod crm_api;
pub mod platform;
pub mod storage;
