//! `instance.link` three-line link file (C4, I3).

use crate::error::{LauncherError, Result};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Resolves the fixed location of an instance's link file.
pub fn link_path(instance_root: &Path) -> PathBuf {
    instance_root.join("instance.link")
}

/// Write the three-line `host\nport\nsecret\n` link file. Called only after
/// the server socket has bound, so the resolved port is always accurate.
pub fn write(instance_root: &Path, addr: SocketAddr, secret: &str) -> Result<()> {
    let path = link_path(instance_root);
    let contents = format!("{}\n{}\n{}\n", addr.ip(), addr.port(), secret);
    std::fs::write(&path, contents).map_err(|source| LauncherError::InstanceIo { path, source })
}

/// Delete the link file if present. Called both before a launch attempt
/// (to avoid exposing stale data if the bind then fails) and when the
/// server closes.
pub fn delete(instance_root: &Path) -> Result<()> {
    let path = link_path(instance_root);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LauncherError::InstanceIo { path, source }),
    }
}

/// Parsed link file contents: host, port, secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub host: String,
    pub port: u16,
    pub secret: String,
}

pub fn read(instance_root: &Path) -> Result<Link> {
    let path = link_path(instance_root);
    let text = std::fs::read_to_string(&path).map_err(|source| LauncherError::InstanceIo {
        path: path.clone(),
        source,
    })?;
    parse(&text).ok_or_else(|| LauncherError::Config(format!("malformed link file at {}", path.display())))
}

fn parse(text: &str) -> Option<Link> {
    let mut lines = text.lines();
    let host = lines.next()?.to_string();
    let port = lines.next()?.parse().ok()?;
    let secret = lines.next()?.to_string();
    Some(Link { host, port, secret })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4242);
        write(dir.path(), addr, "s3cr3t").unwrap();

        let link = read(dir.path()).unwrap();
        assert_eq!(link.port, 4242);
        assert_eq!(link.secret, "s3cr3t");
    }

    #[test]
    fn delete_is_idempotent_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        delete(dir.path()).unwrap();
        delete(dir.path()).unwrap();
    }
}
