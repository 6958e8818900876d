pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod freshness;
pub mod head;
pub mod logging;
pub mod pipeline;
pub mod prefetch;
pub mod server;
pub mod store;
pub mod target;
