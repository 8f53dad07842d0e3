#![allow(
    clippy::module_name_repetitions,
    clippy::cast_sign_loss,
    rustdoc::broken_intra_doc_links
)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unused_must_use)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! A single, unified async client for heterogeneous perpetual-futures
//! venues: one [`adapter::VenueAdapter`] trait, one set of [`types`]
//! records, one [`error::ApiError`] taxonomy, regardless of which
//! venue's wire format sits underneath.
//!
//! Construct an adapter with [`config::create_exchange`]:
//!
//! ```no_run
//! use perp_unify::config::{create_exchange, ExchangeConfig, VenueId};
//! use perp_unify::VenueAdapter;
//!
//! # async fn run() -> Result<(), perp_unify::ApiError> {
//! let adapter = create_exchange(VenueId::Reference, ExchangeConfig::default())?;
//! adapter.initialize().await?;
//! let markets = adapter.fetch_markets().await?;
//! # let _ = markets;
//! # Ok(())
//! # }
//! ```
//!
//! See [`adapter::VenueAdapter`] for the full operation surface.

pub mod adapter;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod rate_limiter;
pub mod types;
pub mod venues;
pub mod ws;

pub use adapter::VenueAdapter;
pub use config::{create_exchange, ExchangeConfig, VenueId};
pub use error::{ApiError, ErrorCategory};
