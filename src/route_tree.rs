//! Longest-prefix-match lookup over IPv4 networks.
//!
//! A binary trie indexed by address bit, most significant first. Nodes live in a single `Vec` and refer to their
//! children by index. The root is the `/0` node, a node at depth `n` stands for a `/n` network.
//!
//! The tree is built once and then only read, so it can be shared between any number of forwarding threads.

use std::iter;
use std::net::Ipv4Addr;

use thiserror::Error;

use crate::cidr::{Cidr, CidrError, MAX_PREFIX};
use crate::route::Route;

const ROOT: usize = 0;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteTreeError {
    #[error("invalid prefix: {0}")]
    InvalidPrefix(#[from] CidrError),
}

#[derive(Clone, Debug)]
struct Node<T> {
    children: [Option<usize>; 2],
    owner: Option<T>,
}

impl<T> Node<T> {
    fn empty() -> Self {
        Self { children: [None, None], owner: None }
    }
}

#[derive(Clone, Debug)]
pub struct RouteTree<T> {
    nodes: Vec<Node<T>>,
    len: usize,
}

impl<T> Default for RouteTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn bit(addr: u32, depth: u8) -> usize {
    ((addr >> (MAX_PREFIX - 1 - depth)) & 1) as usize
}

impl<T> RouteTree<T> {
    pub fn new() -> Self {
        Self { nodes: vec![Node::empty()], len: 0 }
    }

    /// Number of networks with an owner.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `owner` for `cidr`, returning the owner it replaced if the same network was inserted before.
    pub fn insert(&mut self, cidr: Cidr, owner: T) -> Option<T> {
        let addr = u32::from(cidr.addr());
        let mut node = ROOT;
        for depth in 0..cidr.prefix() {
            let branch = bit(addr, depth);
            node = match self.nodes[node].children[branch] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::empty());
                    self.nodes[node].children[branch] = Some(child);
                    child
                }
            };
        }
        let previous = self.nodes[node].owner.replace(owner);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Like [`Self::insert`] for callers holding an unvalidated address and prefix length.
    pub fn insert_prefix(&mut self, addr: Ipv4Addr, prefix: u8, owner: T) -> Result<Option<T>, RouteTreeError> {
        let cidr = Cidr::new(addr, prefix)?;
        Ok(self.insert(cidr, owner))
    }

    /// Owner of the most specific network containing `addr`.
    pub fn most_specific_contains(&self, addr: Ipv4Addr) -> Option<&T> {
        self.path(u32::from(addr), MAX_PREFIX).filter_map(|(_, node)| node.owner.as_ref()).last()
    }

    /// Owner of the least specific network containing `addr`.
    pub fn contains(&self, addr: Ipv4Addr) -> Option<&T> {
        self.path(u32::from(addr), MAX_PREFIX).find_map(|(_, node)| node.owner.as_ref())
    }

    /// Owner stored for exactly `cidr`.
    pub fn get(&self, cidr: Cidr) -> Option<&T> {
        self.path(u32::from(cidr.addr()), cidr.prefix())
            .find(|(depth, _)| *depth == cidr.prefix())
            .and_then(|(_, node)| node.owner.as_ref())
    }

    /// The most specific entry strictly broader than `cidr`.
    pub fn covering(&self, cidr: Cidr) -> Option<(Cidr, &T)> {
        let addr = u32::from(cidr.addr());
        self.path(addr, cidr.prefix())
            .filter(|(depth, _)| *depth < cidr.prefix())
            .filter_map(|(depth, node)| Some((Cidr::masked(Ipv4Addr::from(addr), depth).ok()?, node.owner.as_ref()?)))
            .last()
    }

    /// Entries in pre-order: broader networks before the networks below them, the 0 branch before the 1 branch.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { tree: self, stack: vec![(ROOT, 0, 0)] }
    }

    // Nodes along the bit path of `addr`, down to `max_depth` or the first missing child.
    fn path(&self, addr: u32, max_depth: u8) -> impl Iterator<Item = (u8, &Node<T>)> + '_ {
        iter::successors(Some((ROOT, 0u8)), move |&(node, depth)| {
            if depth >= max_depth {
                return None;
            }
            self.nodes[node].children[bit(addr, depth)].map(|child| (child, depth + 1))
        })
        .map(|(node, depth)| (depth, &self.nodes[node]))
    }
}

pub struct Iter<'a, T> {
    tree: &'a RouteTree<T>,
    stack: Vec<(usize, u32, u8)>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Cidr, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some((index, addr, depth)) = self.stack.pop() {
            let node = &tree.nodes[index];
            for (branch, child) in node.children.iter().enumerate().rev() {
                if let Some(child) = child {
                    let child_addr = addr | ((branch as u32) << (MAX_PREFIX - 1 - depth));
                    self.stack.push((*child, child_addr, depth + 1));
                }
            }
            if let Some(owner) = &node.owner
                && let Ok(cidr) = Cidr::new(Ipv4Addr::from(addr), depth)
            {
                return Some((cidr, owner));
            }
        }
        None
    }
}

/// Knobs for [`RouteTree::from_routes`]. Neither changes which owner a lookup resolves to.
#[derive(Clone, Copy, Debug)]
pub struct TreeBuildOptions {
    /// Log routes that replace or sit beneath another route with a different gateway.
    pub report_shadowed: bool,
    /// Whether the platform honours a per-route MTU. If not, routes configuring one are logged.
    pub mtu_supported: bool,
}

impl Default for TreeBuildOptions {
    fn default() -> Self {
        Self { report_shadowed: true, mtu_supported: true }
    }
}

impl RouteTree<Ipv4Addr> {
    /// Maps every route carrying a gateway to that gateway. Later routes win over earlier ones for the same network.
    pub fn from_routes(routes: &[Route], options: TreeBuildOptions) -> Self {
        let mut tree = Self::new();
        for route in routes {
            if !options.mtu_supported && route.has_custom_mtu() {
                tracing::warn!(
                    message_id = "Ieh5eeXo",
                    route = %route.cidr,
                    mtu = route.mtu,
                    "route MTU is not supported on this platform, using the tunnel MTU"
                );
            }
            let Some(via) = route.via else {
                continue;
            };
            if options.report_shadowed
                && let Some((covering, owner)) = tree.covering(route.cidr)
                && *owner != via
            {
                tracing::info!(
                    message_id = "ohR4ahsh",
                    route = %route.cidr,
                    %via,
                    %covering,
                    covering.via = %owner,
                    "route is nested inside a broader route with a different gateway"
                );
            }
            match tree.insert(route.cidr, via) {
                Some(previous) if options.report_shadowed && previous != via => tracing::warn!(
                    message_id = "Ucho7uva",
                    route = %route.cidr,
                    %via,
                    previous.via = %previous,
                    "route replaces an earlier route for the same network, the earlier route can never match"
                ),
                Some(_) if options.report_shadowed => {
                    tracing::debug!(message_id = "Xae9veng", route = %route.cidr, %via, "duplicate route")
                }
                _ => {}
            }
        }
        tracing::info!(message_id = "Quai4eij", entries = tree.len(), routes = routes.len(), "built route tree");
        tree
    }
}
