//! Store application configuration that gets read from disk
use crate::error::Error;
use crate::services::{new_routing_handler, RoutingService, TravelMode};
use crate::speed::DEFAULT_SPEED_RATIO;
use crate::tracker::{DEFAULT_ARRIVAL_THRESHOLD_M, DEFAULT_DEVIATION_THRESHOLD_M};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::io::prelude::*;
use std::str::FromStr;

/// Defines the allowed keys under the services map
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Routing,
}

/// Type alias for clarity
pub type ServiceParameters = HashMap<String, Value>;

/// Configuration options for a single service of any type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    handler: String,
    #[serde(default)]
    configuration: ServiceParameters,
}

impl ServiceConfig {
    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn get_parameter_as_string(&self, key: &str) -> Option<Result<String, Error>> {
        self.configuration.get(key).map(|value| {
            value
                .as_str()
                .ok_or_else(|| {
                    Error::InvalidConfigurationValue(format!(
                        "invalid value for {}.{}, expected a string: {:?}",
                        &self.handler, key, value
                    ))
                })
                .map(|v| v.to_string())
        })
    }

    pub fn get_parameter_as_i64(&self, key: &str) -> Option<Result<i64, Error>> {
        self.configuration.get(key).map(|value| {
            value.as_i64().ok_or_else(|| {
                Error::InvalidConfigurationValue(format!(
                    "invalid value for {}.{}, expected an integer: {:?}",
                    &self.handler, key, value
                ))
            })
        })
    }
}

/// Set a string parameter on the service instance from a ServiceConfig instance
#[macro_export]
macro_rules! set_string_param_from_config {
    ($b:expr, $k:ident, $c:expr) => {
        if let Some(val) = $c.get_parameter_as_string(stringify!($k)) {
            $b.$k = val?
        }
    };
}

#[macro_export]
macro_rules! set_int_param_from_config {
    ($b:expr, $k:ident, $c:expr, $o:ident) => {
        if let Some(val) = $c.get_parameter_as_i64(stringify!($k)) {
            $b.$k = val? as $o
        }
    };
}

/// Tunable bands of the progress tracker
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_deviation_threshold")]
    pub deviation_threshold_m: f64,
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold_m: f64,
    #[serde(default = "default_speed_ratio")]
    pub default_speed_ratio: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            deviation_threshold_m: DEFAULT_DEVIATION_THRESHOLD_M,
            arrival_threshold_m: DEFAULT_ARRIVAL_THRESHOLD_M,
            default_speed_ratio: DEFAULT_SPEED_RATIO,
        }
    }
}

/// Configuration struct that we can create from the config file used
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(
        deserialize_with = "deserialize_level_filter",
        serialize_with = "serialize_level_filter",
        default = "default_level_filter"
    )]
    log_level: LevelFilter,
    #[serde(default = "default_travel_mode")]
    travel_mode: String,
    #[serde(default)]
    tracker: TrackerConfig,
    #[serde(default)]
    services: HashMap<ServiceType, ServiceConfig>,
}

impl Config {
    pub fn load<T: Read>(source: &mut T) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(source)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn tracker(&self) -> &TrackerConfig {
        &self.tracker
    }

    pub fn travel_mode(&self) -> Result<TravelMode, Error> {
        TravelMode::from_str(&self.travel_mode)
    }

    pub fn get_routing_handler(&self) -> Result<Box<dyn RoutingService>, Error> {
        match self.services.get(&ServiceType::Routing) {
            Some(cfg) => new_routing_handler(cfg),
            None => Err(Error::UnknownServiceHandler(
                "no service configuration defined for routing".to_string(),
            )),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_level_filter(),
            travel_mode: default_travel_mode(),
            tracker: TrackerConfig::default(),
            services: HashMap::new(),
        }
    }
}

fn deserialize_level_filter<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    LevelFilter::from_str(&buf)
        .map_err(|_| serde::de::Error::custom(format!("invalid level value: {}", buf)))
}

fn serialize_level_filter<S>(level: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&level.to_string())
}

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

fn default_travel_mode() -> String {
    "car".to_string()
}

fn default_deviation_threshold() -> f64 {
    DEFAULT_DEVIATION_THRESHOLD_M
}

fn default_arrival_threshold() -> f64 {
    DEFAULT_ARRIVAL_THRESHOLD_M
}

fn default_speed_ratio() -> f64 {
    DEFAULT_SPEED_RATIO
}
