//! Async client for the BattleMetrics API.
//!
//! BattleMetrics monitors game servers and hosts the moderation tooling of
//! their organizations: players, bans, ban lists, notes, flags and RCON.
//! This crate wraps its JSON:API endpoints behind typed async methods.
//!
//! # Overview
//!
//! ```no_run
//! use battlemetrics::{Battlemetrics, resources::BanSearch};
//!
//! # async fn run() -> battlemetrics::Result<()> {
//! let client = Battlemetrics::new("your_token")?;
//!
//! let player = client.players().info("42").await?;
//! println!("{}", player.data.attributes.name);
//!
//! let search = BanSearch {
//!     player: Some("42".to_owned()),
//!     ..Default::default()
//! };
//! for ban in client.bans().search(&search).await?.data {
//!     println!("{}: {}", ban.id, ban.attributes.reason);
//! }
//!
//! client.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`http`] - Routes, the HTTP transport with rate-limit retries, and the
//!   normalization of response bodies (JSON repair, ban exports)
//! - [`resources`] - One handle per area of the API
//! - [`types`] - Typed JSON:API documents and attributes
//! - [`client`] - The [`Battlemetrics`] entry point
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`error`] - The [`Error`] type and its [`ErrorKind`] classification
//! - [`utils`] - Time windows, durations and text helpers

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resources;
pub mod types;
pub mod utils;

pub use client::{ActivityFilter, Battlemetrics};
pub use error::{Error, ErrorKind, Result};
