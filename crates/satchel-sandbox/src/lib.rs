//! # Satchel Sandbox
//!
//! Hosts a game session around the inventory core:
//! - Configuration file
//! - Catalog loading and save slots on disk
//! - Command scripts standing in for player input

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod commands;
pub mod config;
pub mod save_manager;
pub mod session;
