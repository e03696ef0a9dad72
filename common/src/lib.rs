//! Shared utilities for the screen workspace: pixel grids, logging setup,
//! bounded parallel mapping, file listing and TOML config files.

pub mod buffer2;
pub mod file_utils;
pub mod log_setup;
pub mod parallel;
pub mod test_utils;
pub mod toml_file;

pub use buffer2::Buffer2;
