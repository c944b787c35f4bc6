//! webtime Daemon - Clock ticker and websocket fan-out server
//!
//! This crate provides the core infrastructure for the webtime daemon:
//! - `ticker` - The single producer that republishes the time every interval
//! - `registrar` - One observer task per subscriber, fed by the ticker
//! - `server` - HTTP/websocket server relaying subscriptions to peers
//! - `config` - Layered daemon configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      webtimed daemon                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   TimeServer    │────▶│   SubscriptionRegistrar     │   │
//! │  │  (HTTP / ws)    │     │  (observer task per peer)   │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             │                   │
//! │           │ connections                 │ changed()         │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ConnectionHandler│     │   ValueUpdater              │   │
//! │  │  (per peer)     │     │   (watch::Sender<Tick>)     │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod registrar;
pub mod server;
pub mod ticker;
