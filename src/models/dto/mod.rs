pub mod generation_dto;
pub mod request;
pub mod response;
