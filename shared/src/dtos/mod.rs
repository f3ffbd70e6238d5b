pub mod progress_dto;
pub mod status_dto;
