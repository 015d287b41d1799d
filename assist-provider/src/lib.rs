pub mod assist;
pub mod config;
