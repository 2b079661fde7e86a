pub mod autosave;
pub mod cloudinary;
pub mod profile;
pub mod publish;
pub mod shopify;
