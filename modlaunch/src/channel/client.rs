//! One-shot command-channel client (C4): used by a peer invocation to send
//! `stop` to a running instance.

use crate::error::{LauncherError, Result};

use super::crypto::Cipher;

use std::net::UdpSocket;

/// Send `verb` to `host:port`, encrypted with `secret`. Opens an ephemeral
/// socket, sends exactly one datagram, and returns without waiting for any
/// acknowledgement.
pub fn send(host: &str, port: u16, secret: &str, verb: &str) -> Result<()> {
    let cipher = Cipher::new(secret)?;
    let ciphertext = cipher.encrypt(verb.as_bytes());

    let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(|e| LauncherError::Transport(e.to_string()))?;
    socket
        .send_to(&ciphertext, (host, port))
        .map_err(|e| LauncherError::Transport(e.to_string()))?;
    Ok(())
}

/// Convenience wrapper for the `stop` verb specifically.
pub fn send_stop(host: &str, port: u16, secret: &str) -> Result<()> {
    send(host, port, secret, "stop")
}
