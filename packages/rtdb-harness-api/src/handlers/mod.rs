//! HTTP endpoint implementations for the `.json` data API.

pub mod data_handlers;
pub mod request_utils;

pub use data_handlers::{delete_data, get_data, patch_data};
pub use request_utils::{check_auth, data_path};
