#![doc(html_root_url = "https://docs.rs/rtspio/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # rtspio - RTSP session client
//!
//! `rtspio` drives a single RTSP media session from the client side: it sends
//! SETUP, PLAY, PAUSE and TEARDOWN over a control connection and, while the
//! session plays, receives RTP packets on a UDP socket in a background task,
//! handing each decoded frame to your code.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use rtspio::av::{Frame, SessionHandler};
//! use rtspio::format::rtsp::RTSPClient;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl SessionHandler for Printer {
//!     async fn process_received_frame(&self, frame: Frame) {
//!         println!("frame seq={} bytes={}", frame.sequence_number, frame.payload.len());
//!     }
//!
//!     async fn video_ended(&self, sequence_number: u32) {
//!         println!("stream ended after CSeq {}", sequence_number);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RTSPClient::connect("example.com", 554, Arc::new(Printer)).await?;
//!
//!     client.setup("movie.Mjpeg").await?;
//!     client.play().await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     client.pause().await?;
//!     client.teardown().await?;
//!     client.close().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: the [`Frame`](av::Frame) type and the
//!   [`SessionHandler`](av::SessionHandler) callback trait
//! - `format`: RTP packet decoding and the RTSP client
//! - `config`: receive timeout, buffer size and bind address settings
//! - `error`: the [`RtspError`] taxonomy and [`Result`] alias
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger. Requests and responses are logged at `debug`, session
//! transitions at `info`.

/// Media frame type and the frame consumer trait
pub mod av;

/// Error types and utilities
pub mod error;

/// RTP decoding and RTSP session control
pub mod format;

/// Configuration module
pub mod config;

pub use error::{Result, RtspError};
