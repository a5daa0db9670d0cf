pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod portal;
pub mod services;
pub mod state;
