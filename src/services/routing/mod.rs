//! Request turn-by-turn routes from an external directions service
use crate::config::ServiceConfig;
use crate::error::Error;
use crate::gps::Coordinate;
use crate::polyline;
use crate::{set_int_param_from_config, set_string_param_from_config};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

mod neshan;
pub use neshan::NeshanDirections;

/// Travel profile requested from the routing service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TravelMode {
    Car,
    Motorcycle,
}

impl TravelMode {
    /// Wire value used in the request query string
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Car => "car",
            TravelMode::Motorcycle => "motorcycle",
        }
    }
}

impl FromStr for TravelMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "car" => Ok(TravelMode::Car),
            "motorcycle" => Ok(TravelMode::Motorcycle),
            _ => Err(Error::InvalidConfigurationValue(format!(
                "unknown travel mode: {}",
                value
            ))),
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters of a single route request
#[derive(Clone, Copy, Debug)]
pub struct RouteQuery {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub travel_mode: TravelMode,
    /// Initial heading hint in degrees, the traveller's bearing at request time
    pub initial_bearing_deg: f64,
}

/// Distance or duration reported by the service, machine value plus
/// human readable text
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ValueText {
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub text: String,
}

/// One drivable segment of a leg with its encoded geometry
#[derive(Clone, Debug, Deserialize)]
pub struct RouteStep {
    #[serde(alias = "polyline")]
    pub encoded_polyline: String,
    #[serde(default)]
    pub distance: ValueText,
    #[serde(default)]
    pub duration: ValueText,
}

/// A leg of a candidate route; this crate only ever consumes the first one
#[derive(Clone, Debug, Deserialize)]
pub struct RouteLeg {
    #[serde(default)]
    pub distance: ValueText,
    #[serde(default)]
    pub duration: ValueText,
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CandidateRoute {
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

/// Routing service response, ordered best candidate first
#[derive(Clone, Debug, Deserialize)]
pub struct RoutingResponse {
    #[serde(default)]
    pub routes: Vec<CandidateRoute>,
}

impl RoutingResponse {
    /// Borrow the first leg of the first candidate route, if any
    pub fn first_leg(&self) -> Option<&RouteLeg> {
        self.routes.first().and_then(|route| route.legs.first())
    }
}

/// Flatten the first leg of the first candidate into one coordinate sequence
///
/// Steps are decoded and concatenated in order. A response with no usable
/// legs or steps fails with `EmptyRouteError`, a step with broken geometry
/// propagates the decode error, and in both cases no partial route escapes.
pub fn flatten_first_leg(response: &RoutingResponse) -> Result<Vec<Coordinate>, Error> {
    let leg = response.first_leg().ok_or_else(|| {
        Error::EmptyRouteError("response carried no candidate routes or legs".to_string())
    })?;
    if leg.steps.is_empty() {
        return Err(Error::EmptyRouteError(
            "first leg carried no steps".to_string(),
        ));
    }

    let mut points = Vec::new();
    for step in &leg.steps {
        points.extend(polyline::decode(&step.encoded_polyline)?);
    }
    if points.is_empty() {
        return Err(Error::EmptyRouteError(
            "first leg decoded to zero points".to_string(),
        ));
    }
    Ok(points)
}

/// trait that defines how a route is fetched for a given query
pub trait RoutingService {
    /// Request candidate routes between the query's origin and destination
    fn request_route(&self, query: &RouteQuery)
        -> Result<RoutingResponse, Box<dyn std::error::Error>>;
}

/// Create a boxed routing handler from a service configuration block
pub fn new_routing_handler(config: &ServiceConfig) -> Result<Box<dyn RoutingService>, Error> {
    match config.handler() {
        "neshan" => {
            let mut handler = NeshanDirections::default();
            set_string_param_from_config!(handler, base_url, config);
            set_string_param_from_config!(handler, api_key, config);
            set_int_param_from_config!(handler, timeout_s, config, u64);
            Ok(Box::new(handler))
        }
        _ => Err(Error::UnknownServiceHandler(format!(
            "no routing handler exists with the name: {}",
            config.handler()
        ))),
    }
}
