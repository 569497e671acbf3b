use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::cidr::Cidr;
use crate::errors::RouteConfigError;
use crate::route::Route;
use crate::route_config::{parse_routes, parse_unsafe_routes};
use crate::route_tree::{RouteTree, TreeBuildOptions};
use crate::settings::Settings;

/// Everything validated from one version of the settings.
#[derive(Debug)]
pub struct RouteSnapshot {
    pub routes: Vec<Route>,
    pub unsafe_routes: Vec<Route>,
    pub tree: RouteTree<Ipv4Addr>,
}

impl RouteSnapshot {
    pub fn build(settings: &Settings, network: Cidr, options: TreeBuildOptions) -> Result<Self, RouteConfigError> {
        let routes = parse_routes(settings, network)?;
        let unsafe_routes = parse_unsafe_routes(settings, network)?;
        let tree = RouteTree::from_routes(&unsafe_routes, options);
        Ok(Self { routes, unsafe_routes, tree })
    }
}

/// The currently published routes of a node.
///
/// Readers take a snapshot without locking and keep using it for as long as they like. A reload validates the new
/// settings completely before swapping them in, so a rejected reload leaves the published snapshot untouched.
pub struct RouteState {
    network: Cidr,
    options: TreeBuildOptions,
    epoch: AtomicU64,
    snapshot: ArcSwap<RouteSnapshot>,
}

impl RouteState {
    pub fn new(settings: &Settings, network: Cidr, options: TreeBuildOptions) -> Result<Self, RouteConfigError> {
        let snapshot = RouteSnapshot::build(settings, network, options)?;
        Ok(Self { network, options, epoch: AtomicU64::new(0), snapshot: ArcSwap::from_pointee(snapshot) })
    }

    pub fn network(&self) -> Cidr {
        self.network
    }

    pub fn snapshot(&self) -> Arc<RouteSnapshot> {
        self.snapshot.load_full()
    }

    /// Gateway for `addr` according to the current snapshot.
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<Ipv4Addr> {
        self.snapshot.load().tree.most_specific_contains(addr).copied()
    }

    /// Number of successful reloads.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn reload(&self, settings: &Settings) -> Result<(), RouteConfigError> {
        let next = match RouteSnapshot::build(settings, self.network, self.options) {
            Ok(next) => next,
            Err(error) => {
                tracing::error!(message_id = "eeN0ohgh", %error, "rejected route reload, keeping current routes");
                return Err(error);
            }
        };
        let (routes, unsafe_routes) = (next.routes.len(), next.unsafe_routes.len());
        let previous = self.snapshot.swap(Arc::new(next));
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            message_id = "Oow1ahfe",
            epoch,
            routes.before = previous.routes.len(),
            routes.after = routes,
            unsafe_routes.before = previous.unsafe_routes.len(),
            unsafe_routes.after = unsafe_routes,
            "reloaded routes"
        );
        Ok(())
    }
}
