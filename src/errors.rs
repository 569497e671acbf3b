use std::num::ParseIntError;

use thiserror::Error;

use crate::cidr::{Cidr, CidrError};
use crate::settings::ParseBoolError;

/// Why a `tun.routes` or `tun.unsafe_routes` list was rejected.
///
/// `key` is the settings key of the list and `index` is the 1-based position of the offending entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteConfigError {
    #[error("{key} is not an array")]
    NotAnArray { key: &'static str },
    #[error("entry {index} in {key} is invalid")]
    InvalidEntry { key: &'static str, index: usize },
    #[error("entry {index}.{field} in {key} is not present")]
    MissingField { key: &'static str, index: usize, field: &'static str },
    #[error("entry {index}.{field} in {key} is not an integer: parsing {raw:?}: {source}")]
    NotAnInteger {
        key: &'static str,
        index: usize,
        field: &'static str,
        raw: String,
        source: ParseIntError,
    },
    #[error("entry {index}.mtu in {key} is below 500: {mtu}")]
    MtuTooLow { key: &'static str, index: usize, mtu: i64 },
    #[error("entry {index}.route in {key} failed to parse: {source}")]
    InvalidCidr { key: &'static str, index: usize, raw: String, source: CidrError },
    #[error(
        "entry {index}.route in {key} is not contained within the network attached to the certificate; route: {route}, network: {network}"
    )]
    RouteNotContained { key: &'static str, index: usize, route: Cidr, network: Cidr },
    #[error(
        "entry {index}.route in {key} is contained within the network attached to the certificate; route: {route}, network: {network}"
    )]
    RouteIsContained { key: &'static str, index: usize, route: Cidr, network: Cidr },
    #[error("entry {index}.{field} in {key} is not a string: found {found}")]
    NotAString { key: &'static str, index: usize, field: &'static str, found: &'static str },
    #[error("entry {index}.{field} in {key} failed to parse address: {raw}")]
    InvalidAddress { key: &'static str, index: usize, field: &'static str, raw: String },
    #[error("entry {index}.{field} in {key} is not a boolean: parsing {raw:?}: {source}")]
    NotABoolean {
        key: &'static str,
        index: usize,
        field: &'static str,
        raw: String,
        source: ParseBoolError,
    },
}

impl RouteConfigError {
    /// The 1-based entry index, absent when the list itself is malformed.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::NotAnArray { .. } => None,
            Self::InvalidEntry { index, .. }
            | Self::MissingField { index, .. }
            | Self::NotAnInteger { index, .. }
            | Self::MtuTooLow { index, .. }
            | Self::InvalidCidr { index, .. }
            | Self::RouteNotContained { index, .. }
            | Self::RouteIsContained { index, .. }
            | Self::NotAString { index, .. }
            | Self::InvalidAddress { index, .. }
            | Self::NotABoolean { index, .. } => Some(*index),
        }
    }
}
