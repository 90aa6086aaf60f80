pub mod upload;
pub mod analysis;
