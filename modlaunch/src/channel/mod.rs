//! Command Channel (C4).

pub mod client;
pub mod crypto;
pub mod link;
pub mod server;

pub use client::{send, send_stop};
pub use crypto::Cipher;
pub use link::Link;
pub use server::{CommandServer, Handler};
