pub mod instagram;
pub mod log;
