use std::net::Ipv4Addr;

use serde_json::json;

use crate::cidr::{Cidr, CidrError};
use crate::route::Route;
use crate::route_config::parse_unsafe_routes;
use crate::route_tree::{RouteTree, RouteTreeError, TreeBuildOptions};
use crate::settings::Settings;

fn cidr(s: &str) -> Cidr {
    s.parse().unwrap()
}

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn unsafe_route(route: &str, via: &str) -> Route {
    Route { cidr: cidr(route), mtu: 0, metric: None, install: true, via: Some(ip(via)) }
}

#[test]
fn from_unsafe_routes() {
    let settings = Settings::from_value(json!({ "tun": { "unsafe_routes": [
        { "via": "192.168.0.1", "route": "1.0.0.0/28" },
        { "via": "192.168.0.2", "route": "1.0.0.1/32" },
    ]}}));
    let routes = parse_unsafe_routes(&settings, cidr("10.0.0.0/24")).unwrap();
    assert_eq!(routes.len(), 2);
    let tree = RouteTree::from_routes(&routes, TreeBuildOptions::default());

    assert_eq!(tree.most_specific_contains(ip("1.0.0.2")), Some(&ip("192.168.0.1")));
    assert_eq!(tree.most_specific_contains(ip("1.0.0.1")), Some(&ip("192.168.0.2")));
    assert_eq!(tree.most_specific_contains(ip("1.1.0.1")), None);
}

#[test]
fn longest_prefix_wins() {
    let mut tree = RouteTree::new();
    tree.insert(cidr("0.0.0.0/0"), "default");
    tree.insert(cidr("10.0.0.0/8"), "eight");
    tree.insert(cidr("10.1.0.0/16"), "sixteen");
    tree.insert(cidr("10.1.2.3/32"), "host");

    assert_eq!(tree.most_specific_contains(ip("10.1.2.3")), Some(&"host"));
    assert_eq!(tree.most_specific_contains(ip("10.1.2.4")), Some(&"sixteen"));
    assert_eq!(tree.most_specific_contains(ip("10.2.0.0")), Some(&"eight"));
    assert_eq!(tree.most_specific_contains(ip("11.0.0.0")), Some(&"default"));
    assert_eq!(tree.most_specific_contains(ip("255.255.255.255")), Some(&"default"));

    assert_eq!(tree.contains(ip("10.1.2.3")), Some(&"default"));
    assert_eq!(tree.len(), 4);
}

#[test]
fn empty_tree() {
    let tree: RouteTree<u8> = RouteTree::default();
    assert!(tree.is_empty());
    assert_eq!(tree.most_specific_contains(ip("1.2.3.4")), None);
    assert_eq!(tree.contains(ip("1.2.3.4")), None);
    assert_eq!(tree.iter().count(), 0);
}

#[test]
fn last_insert_wins() {
    let mut tree = RouteTree::new();
    assert_eq!(tree.insert(cidr("1.0.0.0/24"), 1), None);
    assert_eq!(tree.insert(cidr("1.0.0.0/24"), 2), Some(1));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.most_specific_contains(ip("1.0.0.9")), Some(&2));

    let routes = [unsafe_route("1.0.0.0/24", "192.168.0.1"), unsafe_route("1.0.0.0/24", "192.168.0.2")];
    let tree = RouteTree::from_routes(&routes, TreeBuildOptions::default());
    assert_eq!(tree.most_specific_contains(ip("1.0.0.9")), Some(&ip("192.168.0.2")));
}

#[test]
fn diagnostics_do_not_change_results() {
    let routes = [
        unsafe_route("1.0.0.0/8", "192.168.0.1"),
        unsafe_route("1.2.0.0/16", "192.168.0.2"),
        unsafe_route("1.2.0.0/16", "192.168.0.3"),
        Route { mtu: 1300, ..unsafe_route("2.0.0.0/8", "192.168.0.4") },
        Route::safe(cidr("10.0.0.0/24"), 1500),
    ];
    let quiet = RouteTree::from_routes(&routes, TreeBuildOptions { report_shadowed: false, mtu_supported: true });
    let loud = RouteTree::from_routes(&routes, TreeBuildOptions { report_shadowed: true, mtu_supported: false });

    for addr in ["1.1.1.1", "1.2.3.4", "2.3.4.5", "10.0.0.1", "3.0.0.0"] {
        assert_eq!(quiet.most_specific_contains(ip(addr)), loud.most_specific_contains(ip(addr)), "{addr}");
    }
    assert_eq!(loud.most_specific_contains(ip("1.2.3.4")), Some(&ip("192.168.0.3")));
    // Routes without a gateway never enter the tree.
    assert_eq!(loud.most_specific_contains(ip("10.0.0.1")), None);
    assert_eq!(loud.len(), 3);
}

#[test]
fn exact_and_covering() {
    let mut tree = RouteTree::new();
    tree.insert(cidr("10.0.0.0/8"), 'a');
    tree.insert(cidr("10.1.0.0/16"), 'b');

    assert_eq!(tree.get(cidr("10.0.0.0/8")), Some(&'a'));
    assert_eq!(tree.get(cidr("10.1.0.0/16")), Some(&'b'));
    assert_eq!(tree.get(cidr("10.0.0.0/9")), None);
    assert_eq!(tree.get(cidr("10.1.0.0/24")), None);
    assert_eq!(tree.get(cidr("0.0.0.0/0")), None);

    assert_eq!(tree.covering(cidr("10.1.2.0/24")), Some((cidr("10.1.0.0/16"), &'b')));
    assert_eq!(tree.covering(cidr("10.1.0.0/16")), Some((cidr("10.0.0.0/8"), &'a')));
    assert_eq!(tree.covering(cidr("10.0.0.0/8")), None);
    assert_eq!(tree.covering(cidr("11.0.0.0/8")), None);
}

#[test]
fn iter_pre_order() {
    let mut tree = RouteTree::new();
    tree.insert(cidr("128.0.0.0/1"), 4);
    tree.insert(cidr("10.1.0.0/16"), 3);
    tree.insert(cidr("10.0.0.0/8"), 2);
    tree.insert(cidr("0.0.0.0/0"), 1);
    tree.insert(cidr("1.2.3.4/32"), 5);

    let entries = tree.iter().map(|(cidr, owner)| (cidr.to_string(), *owner)).collect::<Vec<_>>();
    assert_eq!(
        entries,
        vec![
            ("0.0.0.0/0".to_string(), 1),
            ("1.2.3.4/32".to_string(), 5),
            ("10.0.0.0/8".to_string(), 2),
            ("10.1.0.0/16".to_string(), 3),
            ("128.0.0.0/1".to_string(), 4),
        ]
    );
}

#[test]
fn insert_prefix_rejects_malformed() {
    let mut tree = RouteTree::new();
    assert_eq!(
        tree.insert_prefix(ip("1.0.0.0"), 33, ()),
        Err(RouteTreeError::InvalidPrefix(CidrError::PrefixTooLong(33)))
    );
    assert_eq!(
        tree.insert_prefix(ip("1.0.0.1"), 24, ()),
        Err(RouteTreeError::InvalidPrefix(CidrError::NonCanonical { addr: ip("1.0.0.1"), prefix: 24 }))
    );
    assert!(tree.is_empty());
    assert_eq!(tree.insert_prefix(ip("1.0.0.0"), 24, ()), Ok(None));
    assert_eq!(tree.most_specific_contains(ip("1.0.0.200")), Some(&()));
}

#[test]
fn shared_between_threads() {
    let mut tree = RouteTree::new();
    tree.insert(cidr("1.0.0.0/8"), ip("192.168.0.1"));
    let tree = std::sync::Arc::new(tree);
    let handles = (0..4)
        .map(|i| {
            let tree = tree.clone();
            std::thread::spawn(move || tree.most_specific_contains(Ipv4Addr::new(1, i, 0, 1)).copied())
        })
        .collect::<Vec<_>>();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(ip("192.168.0.1")));
    }
}
