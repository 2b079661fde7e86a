pub mod page;
pub mod shop;
pub mod user;
