pub mod cidr;
pub mod errors;
pub mod route;
pub mod route_config;
pub mod route_state;
pub mod route_tree;
pub mod settings;

#[cfg(test)]
mod route_tree_test;

pub use cidr::Cidr;
pub use errors::RouteConfigError;
pub use route::Route;
pub use route_config::{parse_routes, parse_unsafe_routes};
pub use route_state::{RouteSnapshot, RouteState};
pub use route_tree::{RouteTree, TreeBuildOptions};
pub use settings::Settings;
