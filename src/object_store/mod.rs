//! HTTP integration with the remote object store that holds index artifacts.

mod client;
mod types;

pub use client::ObjectStoreClient;
pub use types::ObjectStoreError;
