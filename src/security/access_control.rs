//! IP allow/block lists.
//!
//! # Design Decisions
//! - `blocklist` mode denies listed addresses, `allowlist` mode denies
//!   everything not listed
//! - Lists are lock-free sets; edits are visible to the next check
//! - Addresses are parsed `IpAddr`s, so `::ffff:` forms and spacing never
//!   slip past a string comparison

use std::net::IpAddr;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};

use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    #[serde(alias = "blacklist")]
    Blocklist,
    #[serde(alias = "whitelist")]
    Allowlist,
}

/// Point-in-time view of both lists, sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessSnapshot {
    pub mode: AccessMode,
    pub allowlist: Vec<IpAddr>,
    pub blocklist: Vec<IpAddr>,
}

#[derive(Debug, Default)]
pub struct IpAccessControl {
    mode: AccessMode,
    allowlist: DashSet<IpAddr>,
    blocklist: DashSet<IpAddr>,
}

impl IpAccessControl {
    pub fn new(
        mode: AccessMode,
        allowlist: impl IntoIterator<Item = IpAddr>,
        blocklist: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        Self {
            mode,
            allowlist: allowlist.into_iter().collect(),
            blocklist: blocklist.into_iter().collect(),
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Access decision for `ip` under the current mode.
    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        let ip = canonical(ip);
        let allowed = match self.mode {
            AccessMode::Blocklist => !self.blocklist.contains(&ip),
            AccessMode::Allowlist => self.allowlist.contains(&ip),
        };
        if !allowed {
            tracing::warn!(ip = %ip, mode = ?self.mode, "Access denied");
            metrics::record_access_denied();
        }
        allowed
    }

    /// Add to the allowlist. Returns `false` if already present.
    pub fn allow(&self, ip: IpAddr) -> bool {
        self.allowlist.insert(canonical(ip))
    }

    pub fn disallow(&self, ip: IpAddr) -> bool {
        self.allowlist.remove(&canonical(ip)).is_some()
    }

    /// Add to the blocklist. Returns `false` if already present.
    pub fn block(&self, ip: IpAddr) -> bool {
        let inserted = self.blocklist.insert(canonical(ip));
        if inserted {
            tracing::info!(ip = %ip, "Address blocked");
        }
        inserted
    }

    pub fn unblock(&self, ip: IpAddr) -> bool {
        self.blocklist.remove(&canonical(ip)).is_some()
    }

    pub fn snapshot(&self) -> AccessSnapshot {
        let mut allowlist: Vec<IpAddr> = self.allowlist.iter().map(|ip| *ip).collect();
        let mut blocklist: Vec<IpAddr> = self.blocklist.iter().map(|ip| *ip).collect();
        allowlist.sort();
        blocklist.sort();
        AccessSnapshot {
            mode: self.mode,
            allowlist,
            blocklist,
        }
    }
}

/// IPv4-mapped IPv6 addresses compare as their IPv4 form.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}
