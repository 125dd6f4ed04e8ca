//! Session identity
//!
//! A session is addressed by its tmux name plus the host that runs its tmux
//! server. Busy/idle is never stored here; it is probed on every poll.

use std::fmt;

use serde::{Deserialize, Serialize};

use muxexec_utils::{MuxexecError, Result};

/// Where the tmux server for a session lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// tmux on this machine
    Local,
    /// tmux reached through `ssh <host>`
    Remote { host: String },
}

/// Identity of one named terminal session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    pub name: String,
    pub target: Target,
}

impl SessionId {
    /// Session on the local tmux server
    pub fn local(name: impl Into<String>) -> Result<Self> {
        Self::new(name.into(), Target::Local)
    }

    /// Session on a remote tmux server reached over ssh
    pub fn remote(host: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(MuxexecError::InvalidTarget("empty host".into()));
        }
        Self::new(name.into(), Target::Remote { host })
    }

    /// Build from CLI-style arguments: remote when a host is given
    pub fn from_parts(name: &str, host: Option<&str>) -> Result<Self> {
        match host {
            Some(host) => Self::remote(host, name),
            None => Self::local(name),
        }
    }

    fn new(name: String, target: Target) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(MuxexecError::InvalidTarget("empty session name".into()));
        }
        Ok(Self { name, target })
    }

    /// Remote host, if any
    pub fn host(&self) -> Option<&str> {
        match &self.target {
            Target::Local => None,
            Target::Remote { host } => Some(host),
        }
    }

    /// Filesystem-safe key, unique per identity
    ///
    /// Characters outside `[A-Za-z0-9_.]` are percent-escaped so that
    /// distinct identities never map to the same file.
    pub fn key(&self) -> String {
        match &self.target {
            Target::Local => format!("local-{}", escape(&self.name)),
            Target::Remote { host } => format!("ssh-{}-{}", escape(host), escape(&self.name)),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Local => write!(f, "{}", self.name),
            Target::Remote { host } => write!(f, "{}:{}", host, self.name),
        }
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
