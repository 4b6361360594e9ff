//! Target-to-address resolution

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default DNS lookup timeout
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of resolving a target. Resolution never fails: an unresolved
/// target keeps its original string as `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    /// Target exactly as given
    pub original: String,
    /// Host part, without scheme, credentials, path or port
    pub domain: String,
    /// IP address, or `original` when unresolved
    pub address: String,
    pub resolved: bool,
}

impl ResolvedTarget {
    fn unresolved(original: &str, domain: String) -> Self {
        Self {
            original: original.to_string(),
            domain,
            address: original.to_string(),
            resolved: false,
        }
    }
}

/// Strip scheme, userinfo, path, query and port from a target
pub fn host_of(target: &str) -> String {
    let target = target.trim();
    let rest = target
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(target);

    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority);

    let host = if let Some(bracketed) = host_port.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or(bracketed)
    } else if host_port.matches(':').count() == 1 {
        host_port.split(':').next().unwrap_or(host_port)
    } else {
        host_port
    };

    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Resolve a target with the default timeout
pub async fn resolve_to_address(target: &str) -> ResolvedTarget {
    resolve_with_timeout(target, RESOLVE_TIMEOUT).await
}

/// Resolve a target to an IP address, preferring IPv4
pub async fn resolve_with_timeout(target: &str, timeout: Duration) -> ResolvedTarget {
    let domain = host_of(target);
    if domain.is_empty() {
        return ResolvedTarget::unresolved(target, domain);
    }

    if let Ok(ip) = domain.parse::<Ipv4Addr>() {
        return ResolvedTarget {
            original: target.to_string(),
            address: ip.to_string(),
            domain,
            resolved: true,
        };
    }

    let host = if domain.contains(':') {
        format!("[{}]:0", domain)
    } else {
        format!("{}:0", domain)
    };
    let lookup = tokio::time::timeout(timeout, tokio::net::lookup_host(host)).await;
    let addrs: Vec<IpAddr> = match lookup {
        Ok(Ok(addrs)) => addrs.map(|a| a.ip()).collect(),
        Ok(Err(e)) => {
            debug!(target = %target, "DNS lookup failed: {}", e);
            Vec::new()
        }
        Err(_) => {
            debug!(target = %target, "DNS lookup timed out");
            Vec::new()
        }
    };

    match addrs.iter().find(|a| a.is_ipv4()).or_else(|| addrs.first()) {
        Some(ip) => ResolvedTarget {
            original: target.to_string(),
            address: ip.to_string(),
            domain,
            resolved: true,
        },
        None => ResolvedTarget::unresolved(target, domain),
    }
}
