//! Parking finder core: geocoded destination search, lot resolution with
//! live availability updates, and the companion HTTP service the remote
//! data source talks to.

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod geo;
pub mod metrics;
pub mod pipeline;
pub mod source;
pub mod state;
pub mod store;
