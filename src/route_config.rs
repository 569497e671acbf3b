//! Validation of the `tun.routes` and `tun.unsafe_routes` settings.
//!
//! Both lists are validated fail-fast: the first bad entry rejects the whole list. Entry order is preserved and
//! duplicates are kept, overlapping networks are only a concern of the route tree.

use std::net::Ipv4Addr;

use serde_json::{Map, Value};

use crate::cidr::Cidr;
use crate::errors::RouteConfigError;
use crate::route::{MIN_MTU, Route};
use crate::settings::{Settings, ValueKind, as_map, parse_bool, raw_text};

pub const ROUTES_KEY: &str = "tun.routes";
pub const UNSAFE_ROUTES_KEY: &str = "tun.unsafe_routes";

/// Parses the routes installed directly against the tunnel device. Each must lie within `network`.
pub fn parse_routes(settings: &Settings, network: Cidr) -> Result<Vec<Route>, RouteConfigError> {
    let routes = entries(settings, ROUTES_KEY)?
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let entry = Entry::new(ROUTES_KEY, i + 1, value)?;
            let mtu = entry.mtu(entry.required("mtu")?)?;
            let cidr = entry.cidr(entry.required("route")?)?;
            if !network.contains_network(&cidr) {
                return Err(RouteConfigError::RouteNotContained { key: entry.key, index: entry.index, route: cidr, network });
            }
            Ok(Route::safe(cidr, mtu))
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(message_id = "Ohmee6ai", count = routes.len(), %network, "validated {ROUTES_KEY}");
    Ok(routes)
}

/// Parses the routes relayed through another overlay peer. None may start inside `network`.
pub fn parse_unsafe_routes(settings: &Settings, network: Cidr) -> Result<Vec<Route>, RouteConfigError> {
    let routes = entries(settings, UNSAFE_ROUTES_KEY)?
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let entry = Entry::new(UNSAFE_ROUTES_KEY, i + 1, value)?;
            let via = entry.address("via", entry.required("via")?)?;
            let mtu = match entry.optional("mtu") {
                Some(value) => entry.mtu(value)?,
                None => 0,
            };
            let cidr = entry.cidr(entry.required("route")?)?;
            if network.contains_addr(cidr.addr()) {
                return Err(RouteConfigError::RouteIsContained { key: entry.key, index: entry.index, route: cidr, network });
            }
            let metric = entry.optional("metric").map(|value| entry.integer("metric", value)).transpose()?;
            let install = match entry.optional("install") {
                Some(value) => entry.boolean("install", value)?,
                None => true,
            };
            Ok(Route { cidr, mtu, metric, install, via: Some(via) })
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(message_id = "ca9Phu6e", count = routes.len(), %network, "validated {UNSAFE_ROUTES_KEY}");
    Ok(routes)
}

fn entries<'a>(settings: &'a Settings, key: &'static str) -> Result<&'a [Value], RouteConfigError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(RouteConfigError::NotAnArray { key }),
    }
}

/// One map-shaped list entry, remembering where it came from for error reporting.
struct Entry<'a> {
    key: &'static str,
    index: usize,
    fields: &'a Map<String, Value>,
}

impl<'a> Entry<'a> {
    fn new(key: &'static str, index: usize, value: &'a Value) -> Result<Self, RouteConfigError> {
        let fields = as_map(value).ok_or(RouteConfigError::InvalidEntry { key, index })?;
        Ok(Self { key, index, fields })
    }

    // A field explicitly set to null counts as present and fails decoding instead.
    fn optional(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field)
    }

    fn required(&self, field: &'static str) -> Result<&'a Value, RouteConfigError> {
        self.optional(field)
            .ok_or(RouteConfigError::MissingField { key: self.key, index: self.index, field })
    }

    fn integer(&self, field: &'static str, value: &Value) -> Result<i64, RouteConfigError> {
        let raw = raw_text(value);
        raw.parse().map_err(|source| RouteConfigError::NotAnInteger {
            key: self.key,
            index: self.index,
            field,
            raw,
            source,
        })
    }

    fn mtu(&self, value: &Value) -> Result<u32, RouteConfigError> {
        let mtu = self.integer("mtu", value)?;
        if mtu < MIN_MTU {
            return Err(RouteConfigError::MtuTooLow { key: self.key, index: self.index, mtu });
        }
        let raw = raw_text(value);
        raw.parse().map_err(|source| RouteConfigError::NotAnInteger {
            key: self.key,
            index: self.index,
            field: "mtu",
            raw,
            source,
        })
    }

    fn cidr(&self, value: &Value) -> Result<Cidr, RouteConfigError> {
        let raw = raw_text(value);
        raw.parse().map_err(|source| RouteConfigError::InvalidCidr {
            key: self.key,
            index: self.index,
            raw,
            source,
        })
    }

    fn address(&self, field: &'static str, value: &Value) -> Result<Ipv4Addr, RouteConfigError> {
        let Value::String(raw) = value else {
            return Err(RouteConfigError::NotAString {
                key: self.key,
                index: self.index,
                field,
                found: ValueKind::of(value).as_static_str(),
            });
        };
        raw.parse().map_err(|_| RouteConfigError::InvalidAddress {
            key: self.key,
            index: self.index,
            field,
            raw: raw.clone(),
        })
    }

    fn boolean(&self, field: &'static str, value: &Value) -> Result<bool, RouteConfigError> {
        let raw = raw_text(value);
        parse_bool(&raw).map_err(|source| RouteConfigError::NotABoolean {
            key: self.key,
            index: self.index,
            field,
            raw,
            source,
        })
    }
}
