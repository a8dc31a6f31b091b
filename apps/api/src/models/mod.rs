pub mod builder;
pub mod profile;
pub mod upload;
