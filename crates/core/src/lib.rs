//! Domain logic for the keychain generator backend.
//!
//! Nothing in this crate knows about HTTP. The API crate wires these pieces
//! to axum handlers; the sweeper binary reuses [`retention`] directly.

pub mod cache_key;
pub mod generator;
pub mod kernel;
pub mod layout;
pub mod mesh;
pub mod plan;
pub mod retention;
pub mod types;
pub mod upload;
