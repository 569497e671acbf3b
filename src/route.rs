use std::net::Ipv4Addr;

use serde::Serialize;

use crate::cidr::Cidr;

/// Smallest MTU a route may configure. Below this the tunnel overhead leaves no room for a useful payload.
pub const MIN_MTU: i64 = 500;

/// A validated route.
///
/// Safe routes (`tun.routes`) always install and never carry `via` or `metric`. Unsafe routes (`tun.unsafe_routes`)
/// always carry `via`, the overlay peer that relays traffic for `cidr`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub cidr: Cidr,
    /// Zero means the tunnel's default MTU.
    pub mtu: u32,
    pub metric: Option<i64>,
    pub install: bool,
    pub via: Option<Ipv4Addr>,
}

impl Route {
    pub fn safe(cidr: Cidr, mtu: u32) -> Self {
        Self { cidr, mtu, metric: None, install: true, via: None }
    }

    pub fn is_unsafe(&self) -> bool {
        self.via.is_some()
    }

    pub fn has_custom_mtu(&self) -> bool {
        self.mtu != 0
    }
}
