//! Long-running tasks spawned alongside the HTTP server.

pub mod retention;
