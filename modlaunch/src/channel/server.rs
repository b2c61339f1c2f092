//! UDP command-channel server (C4): a single dedicated receive thread
//! inside a running instance.

use crate::error::{LauncherError, Result};

use super::crypto::Cipher;
use super::link;

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// A received, decrypted verb line, along with the datagram's source.
pub type Handler = Arc<dyn Fn(&str, SocketAddr) + Send + Sync>;

/// Polling interval for the receive thread's read timeout, used only to
/// notice the closing flag in a timely way -- not a protocol timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Bound UDP server. The receive loop runs on its own thread; dropping the
/// server signals it to stop, joins it, and deletes the link file.
pub struct CommandServer {
    local_addr: SocketAddr,
    instance_root: PathBuf,
    handle: Option<JoinHandle<()>>,
    closing: Arc<AtomicBool>,
}

impl CommandServer {
    /// Bind `addr` (port 0 auto-assigns), write the link file, and start
    /// the receive thread. `secret` is encrypted datagrams' shared key;
    /// `handler` is invoked synchronously for each non-comment verb line.
    pub fn bind(
        addr: impl ToSocketAddrs,
        instance_root: PathBuf,
        secret: &str,
        handler: Handler,
    ) -> Result<CommandServer> {
        let socket = UdpSocket::bind(addr).map_err(|e| LauncherError::Transport(e.to_string()))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| LauncherError::Transport(e.to_string()))?;
        socket
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(|e| LauncherError::Transport(e.to_string()))?;

        link::delete(&instance_root)?;
        link::write(&instance_root, local_addr, secret)?;

        let cipher = Cipher::new(secret)?;
        let closing = Arc::new(AtomicBool::new(false));
        let recv_closing = Arc::clone(&closing);

        let handle = std::thread::spawn(move || receive_loop(socket, cipher, handler, recv_closing));

        Ok(CommandServer {
            local_addr,
            instance_root,
            handle: Some(handle),
            closing,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let _ = link::delete(&self.instance_root);
    }
}

fn receive_loop(socket: UdpSocket, cipher: Cipher, handler: Handler, closing: Arc<AtomicBool>) {
    let mut buf = [0u8; 2048];
    loop {
        if closing.load(Ordering::SeqCst) {
            debug!("command channel receive thread exiting");
            return;
        }
        match socket.recv_from(&mut buf) {
            Ok((n, source)) => {
                if let Err(err) = dispatch(&cipher, &buf[..n], source, &handler) {
                    warn!(error = %err, "failed to process command datagram");
                }
            }
            Err(err) if is_timeout(&err) => continue,
            Err(err) => {
                warn!(error = %err, "command channel recv error");
            }
        }
    }
}

fn dispatch(cipher: &Cipher, datagram: &[u8], source: SocketAddr, handler: &Handler) -> Result<()> {
    let plaintext = cipher.decrypt(datagram)?;
    let text = String::from_utf8(plaintext).map_err(|_| LauncherError::Transport("non-UTF-8 payload".to_string()))?;

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        handler(line, source);
    }
    Ok(())
}

/// The periodic read-timeout poll surfaces as `WouldBlock`/`TimedOut`
/// depending on platform; neither is a real receive error.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}
