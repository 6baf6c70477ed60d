//! The connection loop and server lifecycle.

pub(crate) mod connection;
pub mod server_impl;

pub use server_impl::{Server, ServerBuilder};
