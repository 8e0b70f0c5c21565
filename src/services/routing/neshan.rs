//! Fetch routes from a Neshan style directions API over HTTP
use super::{RouteQuery, RoutingResponse, RoutingService};
use crate::error::Error;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

/// Defines the connection parameters for a directions API instance
#[derive(Clone, Debug)]
pub struct NeshanDirections {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    /// Whole-request timeout in seconds
    pub(crate) timeout_s: u64,
}

impl NeshanDirections {
    /// Create a new routing source against the version 4 directions API
    pub fn new(base_url: String, api_key: String) -> Self {
        NeshanDirections {
            base_url,
            api_key,
            ..NeshanDirections::default()
        }
    }

    /// Whole-request timeout applied to the HTTP client
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }

    fn request_url(&self) -> String {
        format!("{}/v4/direction", self.base_url)
    }
}

impl Default for NeshanDirections {
    fn default() -> Self {
        NeshanDirections {
            base_url: "https://api.neshan.org".to_string(),
            api_key: String::new(),
            timeout_s: 10,
        }
    }
}

impl RoutingService for NeshanDirections {
    fn request_route(
        &self,
        query: &RouteQuery,
    ) -> Result<RoutingResponse, Box<dyn std::error::Error>> {
        let origin = format!(
            "{:.6},{:.6}",
            query.origin.latitude(),
            query.origin.longitude()
        );
        let destination = format!(
            "{:.6},{:.6}",
            query.destination.latitude(),
            query.destination.longitude()
        );
        let bearing = format!("{}", query.initial_bearing_deg.round() as i64);

        let client = Client::builder().timeout(self.timeout()).build()?;
        let resp = client
            .get(&self.request_url())
            .header("Api-Key", &self.api_key)
            .query(&[
                ("type", query.travel_mode.as_str()),
                ("origin", origin.as_str()),
                ("destination", destination.as_str()),
                ("bearing", bearing.as_str()),
            ])
            .send()?;
        if resp.status().is_success() {
            Ok(resp.json()?)
        } else {
            // parse error response to get reason why the request failed
            let code = resp.status();
            let json: ErrorResponse = resp.json().unwrap_or(ErrorResponse {
                message: "no error detail provided".to_string(),
            });
            Err(Box::new(Error::RoutingRequestError(code, json.message)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_configurable_with_a_default() {
        assert_eq!(
            NeshanDirections::default().timeout(),
            Duration::from_secs(10)
        );
        let handler = NeshanDirections {
            timeout_s: 30,
            ..NeshanDirections::default()
        };
        assert_eq!(handler.timeout(), Duration::from_secs(30));
    }
}
