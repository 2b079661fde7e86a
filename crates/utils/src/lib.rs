pub mod response;
pub mod shop;
