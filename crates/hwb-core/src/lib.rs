//! Core domain + application logic for the homework status bot.
//!
//! This crate is framework-agnostic. The review API (HTTP) and the chat
//! messenger (Telegram) live behind ports implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod homework;
pub mod logging;
pub mod messaging;
pub mod poller;
pub mod ports;

pub use errors::{Error, Result};
