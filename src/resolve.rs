//! Name resolution for destinations and hop addresses

use dns_lookup::{lookup_addr, lookup_host};
use std::net::{IpAddr, Ipv4Addr};

use crate::config::Dest;
use crate::error::{Error, Result};

/// Resolve the destination to an IPv4 address
///
/// Addresses are passed through untouched. For host names the first IPv4 address returned by the
/// system resolver is used.
///
/// # Errors
///
/// Fails if the lookup fails, which would usually occur if the user provided an invalid
/// destination, or if the host only has IPv6 addresses.
pub fn resolve(dest: &Dest) -> Result<Ipv4Addr> {
    let host = match dest {
        Dest::Ip(addr) => return Ok(*addr),
        Dest::Host(host) => host,
    };

    let addrs = lookup_host(host).map_err(|source| Error::Resolve {
        host: host.clone(),
        source,
    })?;

    let addr = first_ipv4(&addrs).ok_or_else(|| Error::NoIpv4Address(host.clone()))?;
    info!("Resolved host {} to IP {}", host, addr);
    Ok(addr)
}

/// Look up the host name of an address
///
/// Returns `None` if there is no name, or if the name is just the address again.
pub fn reverse(addr: Ipv4Addr) -> Option<String> {
    match lookup_addr(&IpAddr::V4(addr)) {
        Ok(name) if name != addr.to_string() => Some(name),
        Ok(_) => None,
        Err(e) => {
            debug!("Reverse lookup of {} failed: {}", addr, e);
            None
        }
    }
}

fn first_ipv4(addrs: &[IpAddr]) -> Option<Ipv4Addr> {
    addrs.iter().find_map(|addr| match addr {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn addresses_pass_through() {
        let addr = Ipv4Addr::new(192, 0, 2, 1);
        assert_eq!(resolve(&Dest::Ip(addr)).unwrap(), addr);
    }

    #[test]
    fn resolve_localhost() {
        let addr = resolve(&Dest::Host("localhost".to_string())).unwrap();
        assert!(addr.is_loopback());
    }

    #[test]
    fn prefer_first_ipv4() {
        let addrs = [
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)),
        ];
        assert_eq!(first_ipv4(&addrs), Some(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(first_ipv4(&addrs[..1]), None);
    }

    #[test]
    fn unresolvable_host() {
        let err = resolve(&Dest::Host("does-not-exist.invalid".to_string())).unwrap_err();
        assert!(matches!(err, Error::Resolve { .. } | Error::NoIpv4Address(_)));
    }
}
