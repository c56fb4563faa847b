//! Builds a Google Shopping RSS feed from the product data a storefront
//! embeds in its page.
//!
//! The library exposes the pipeline stages individually ([`feed`]) and the
//! whole run ([`app::run`]); the `storefeed` binary wires them to the
//! command line.

pub mod app;
pub mod config;
pub mod feed;
pub mod util;
