//! RADIUS Server Implementation
//!
//! This crate provides a concurrent RADIUS server built on top of the
//! `radserver-proto` packet codec.
//!
//! # Features
//!
//! - Async I/O with Tokio, one task per request
//! - Pluggable request handlers
//! - Per-client shared secrets by IP address or CIDR network
//! - Retransmission suppression while a request is being handled
//! - JSON configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use radserver::{handler_fn, ResponseWriter, Server, ServerConfig};
//! use radserver_proto::Packet;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = handler_fn(|writer: ResponseWriter, packet: Packet| async move {
//!         let accepted = matches!(packet.pap(), Some((user, pass)) if user == "alice" && pass == "password");
//!         let _ = if accepted {
//!             writer.access_accept(Vec::new()).await
//!         } else {
//!             writer.access_reject(Vec::new()).await
//!         };
//!     });
//!
//!     let server = Server::new(ServerConfig::new(":1812", "secret").with_handler(handler));
//!     server.listen_and_serve().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod config;
pub mod handler;
pub mod handlers;
pub mod inflight;
pub mod server;

pub use clients::ClientTable;
pub use config::{Client, Config, ConfigError, User};
pub use handler::{handler_fn, Handler, HandlerFn, ResponseWriter};
pub use handlers::{AccountingLogger, UserTableHandler};
pub use inflight::{InFlightGuard, InFlightKey, InFlightSet};
pub use server::{Network, Server, ServerConfig, ServerError};
