pub mod build;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod helpers;
pub mod loader;
pub mod plugin;
pub mod temp_dir;
pub mod transform;
