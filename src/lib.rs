//! Room photo analysis service
//!
//! This library provides the core functionality for roomsight, a small web
//! service that relays text prompts and room-photo analysis requests to the
//! OpenAI API. Image analysis runs as asynchronous background jobs tracked in
//! PostgreSQL and observable through a row-change notification feed.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
