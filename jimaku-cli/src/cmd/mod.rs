pub mod file;
pub mod grep;
pub mod render;
