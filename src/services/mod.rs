//! Service module that exports interfaces to external applications, APIs, etc.

pub mod routing;

// rexport the trait and factory used by the rest of the crate
pub use routing::{new_routing_handler, RouteQuery, RoutingResponse, RoutingService, TravelMode};
