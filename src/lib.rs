pub mod common;
pub mod config;
pub mod dashboard;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod services;
pub mod surface;
pub mod sync;
