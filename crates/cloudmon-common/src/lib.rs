pub mod resource;
pub mod types;
