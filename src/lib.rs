//! RIPTIDE: Liquidity-Led Prediction Market Signal Monitor
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod alerts;
pub mod config;
pub mod engine;
pub mod platforms;
pub mod types;
