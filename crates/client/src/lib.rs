//! # Office Hours Client
//!
//! A headless client for the office-hours queue: typed HTTP calls, the
//! realtime channel, and a queue view model that front ends render.
//!
//! ```no_run
//! # async fn run() -> eyre::Result<()> {
//! use std::sync::Arc;
//! use officehours_client::{
//!     api::HttpQueueApi, channel::RealtimeChannel, config::ClientConfig,
//!     notify::TracingNotifier, transport::WsConnectionProvider, view::QueueView,
//! };
//!
//! let config = ClientConfig::from_env()?;
//! let channel = RealtimeChannel::new(
//!     Arc::new(WsConnectionProvider::new(&config.ws_url, config.actor())),
//!     config.reconnect_delay,
//! );
//! channel.start();
//!
//! let view = QueueView::new(
//!     Arc::new(HttpQueueApi::new(config.api_url.clone(), config.actor())),
//!     config.user_id,
//!     config.actor(),
//!     Arc::new(TracingNotifier),
//!     config.debounce,
//! );
//! view.attach(&channel);
//! view.load().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod mock;
pub mod notify;
pub mod presence;
pub mod staleness;
pub mod transport;
pub mod view;

pub use error::{ClientError, ClientResult};
