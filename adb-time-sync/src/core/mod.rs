//! Pure, deterministic logic shared by the sync stages.

pub mod date_format;
pub mod devices;
pub mod privilege;
pub mod types;
