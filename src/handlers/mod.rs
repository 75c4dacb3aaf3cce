pub mod download;
pub mod history;
pub mod home;
pub mod media;
pub mod status;
