use ipnetwork::Ipv4Network;
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_PREFIX: u8 = 32;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CidrError {
    #[error("invalid CIDR address: {0}")]
    Invalid(String),
    #[error("prefix length {0} exceeds 32")]
    PrefixTooLong(u8),
    #[error("{addr}/{prefix} has host bits set")]
    NonCanonical { addr: Ipv4Addr, prefix: u8 },
}

/// An IPv4 network whose base address never has host bits set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cidr(Ipv4Network);

impl Cidr {
    /// Strict constructor, the base address must already be canonical.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, CidrError> {
        let cidr = Self::masked(addr, prefix)?;
        if cidr.addr() != addr {
            return Err(CidrError::NonCanonical { addr, prefix });
        }
        Ok(cidr)
    }

    /// Clears any host bits of `addr`, like `10.0.0.5/24` → `10.0.0.0/24`.
    pub fn masked(addr: Ipv4Addr, prefix: u8) -> Result<Self, CidrError> {
        if prefix > MAX_PREFIX {
            return Err(CidrError::PrefixTooLong(prefix));
        }
        let base = Ipv4Addr::from(u32::from(addr) & prefix_mask(prefix));
        Ipv4Network::new(base, prefix)
            .map(Self)
            .map_err(|_| CidrError::PrefixTooLong(prefix))
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.0.network()
    }

    pub fn prefix(&self) -> u8 {
        self.0.prefix()
    }

    pub fn mask(&self) -> u32 {
        prefix_mask(self.prefix())
    }

    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask() == u32::from(self.addr())
    }

    /// True if `other` is equal to or a subnet of `self`.
    pub fn contains_network(&self, other: &Cidr) -> bool {
        self.prefix() <= other.prefix() && self.contains_addr(other.addr())
    }
}

pub(crate) fn prefix_mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (u32::from(MAX_PREFIX) - u32::from(p.min(MAX_PREFIX))),
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CidrError::Invalid(s.to_string());
        let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
        if prefix.is_empty() || prefix.len() > 2 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        Self::masked(addr, prefix).map_err(|_| invalid())
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.prefix())
    }
}

impl From<Cidr> for Ipv4Network {
    fn from(cidr: Cidr) -> Self {
        cidr.0
    }
}
