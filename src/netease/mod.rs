//! NetEase Cloud Music API gateway module

pub mod api;
pub mod auth;
pub mod client;
pub mod models;

pub use api::MusicApi;
pub use client::NeteaseClient;
pub use models::*;
