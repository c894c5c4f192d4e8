pub mod approval;
pub mod config;
pub mod core;
pub mod import_file;
pub mod sessions;
