//! ghprofile library
//!
//! Exposes the fetcher, cache, rendering and command modules for use in
//! integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod health;
pub mod logging;
pub mod readme;
