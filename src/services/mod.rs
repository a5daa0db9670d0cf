pub mod refresh_service;

pub use refresh_service::{RefreshService, RefreshStats, stale_window, stale_window_from_env};
