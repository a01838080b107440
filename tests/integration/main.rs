//! Integration tests for Callboard
//!
//! These tests use wiremock to stand in for remote sources and on-disk
//! SQLite databases in temporary directories, and drive the public API the
//! way the CLI does.

mod common;
mod config_tests;
mod crawl_tests;
mod fetch_tests;
mod scheduler_tests;
