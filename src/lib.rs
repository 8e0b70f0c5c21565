//! Live route-progress tracking for turn-by-turn navigation
//!
//! Given a route computed by an external directions service, this crate
//! matches incoming GPS fixes against it, decides when the traveller has
//! strayed far enough to need a fresh route, and produces an interpolated
//! marker position plus the remaining route geometry for a map layer to
//! render. The pieces compose into a [`NavigationSession`], but each one
//! ([`RouteProgressTracker`], [`SpeedEstimator`], [`MarkerAnimator`], the
//! polyline codec) is usable on its own.
use log::{debug, error};
use std::path::PathBuf;

pub mod cli;
pub mod config;
mod error;
pub mod gps;
pub mod marker;
pub mod polyline;
pub mod services;
pub mod speed;
pub mod tracker;

pub use config::Config;
pub use error::{Error, ErrorKind};
pub use gps::Coordinate;
pub use marker::MarkerAnimator;
pub use speed::SpeedEstimator;
pub use tracker::{Event, PositionFix, RouteProgressTracker, TrackerState};

use services::routing::{RouteQuery, RoutingService};

/// Location of the application config file within the user's home directory
pub fn config_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".route_progress")
        .join("config.yml")
}

/// One navigation session from start to arrival (or stop)
///
/// Owns the tracker, the speed estimator, the marker animator and a boxed
/// routing service, and serializes every state change onto the caller's
/// single logical timeline: feed it fixes via [`on_position`], poll the
/// marker via [`tick`]. Route requests are performed inline through the
/// service, so there is never more than one in flight.
///
/// [`on_position`]: NavigationSession::on_position
/// [`tick`]: NavigationSession::tick
pub struct NavigationSession {
    tracker: RouteProgressTracker,
    speed: SpeedEstimator,
    animator: MarkerAnimator,
    routing: Box<dyn RoutingService>,
}

impl NavigationSession {
    /// Create a session around a routing service with default thresholds
    pub fn new(routing: Box<dyn RoutingService>, travel_mode: services::TravelMode) -> Self {
        NavigationSession {
            tracker: RouteProgressTracker::new(travel_mode),
            speed: SpeedEstimator::default(),
            animator: MarkerAnimator::new(),
            routing,
        }
    }

    /// Create a session with every tunable taken from the config file
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let routing = config.get_routing_handler()?;
        let travel_mode = config.travel_mode()?;
        let tracker_cfg = config.tracker();
        Ok(NavigationSession {
            tracker: RouteProgressTracker::with_thresholds(
                travel_mode,
                tracker_cfg.deviation_threshold_m,
                tracker_cfg.arrival_threshold_m,
            ),
            speed: SpeedEstimator::new(tracker_cfg.default_speed_ratio),
            animator: MarkerAnimator::new(),
            routing,
        })
    }

    pub fn state(&self) -> TrackerState {
        self.tracker.state()
    }

    /// Borrow the tracker, mainly for its leg summary accessors
    pub fn tracker(&self) -> &RouteProgressTracker {
        &self.tracker
    }

    /// Request the initial route and begin tracking
    pub fn start_navigation(&mut self, start: Coordinate, end: Coordinate) -> Vec<Event> {
        match self.tracker.start_navigation(start, end) {
            Some(query) => self.perform_route_request(&query),
            None => Vec::new(),
        }
    }

    /// Feed a raw position fix through the estimator and the tracker
    ///
    /// When the remaining route changes the marker animation is restarted
    /// along its leading segment; when the tracker detects a deviation the
    /// replacement route is fetched before returning.
    pub fn on_position(&mut self, fix: PositionFix) -> Vec<Event> {
        self.speed.update(fix.coordinate, fix.timestamp_ms);

        let (mut events, reroute) = self.tracker.on_position(&fix);
        if let Some(query) = reroute {
            events.extend(self.perform_route_request(&query));
        }
        self.restart_animation(&events, fix.timestamp_ms);
        events
    }

    /// Poll the marker animation at the given wall clock time
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        self.animator.sample(now_ms).map(Event::MarkerMoved)
    }

    /// End the session, cancelling the animation and dropping route state
    pub fn stop(&mut self) {
        self.tracker.stop();
        self.animator.cancel();
        self.speed.reset();
    }

    /// Issue a query through the routing service and feed the tracker the outcome
    fn perform_route_request(&mut self, query: &RouteQuery) -> Vec<Event> {
        debug!(
            "requesting {} route to {:.6},{:.6}",
            query.travel_mode,
            query.destination.latitude(),
            query.destination.longitude()
        );
        match self.routing.request_route(query) {
            Ok(response) => self.tracker.route_received(&response),
            Err(e) => {
                error!("route request failed: {}", e);
                let kind = e
                    .downcast_ref::<Error>()
                    .map(Error::kind)
                    .unwrap_or(ErrorKind::RoutingService);
                self.tracker.route_failed(kind, e.to_string())
            }
        }
    }

    /// Restart the marker animation along the fresh leading segment, or
    /// silence it once the destination is reached
    fn restart_animation(&mut self, events: &[Event], now_ms: u64) {
        for event in events {
            match event {
                Event::RouteUpdated(points) if points.len() >= 2 => {
                    self.animator
                        .start(points[0], points[1], self.speed.average_ratio(), now_ms);
                }
                Event::Arrived => self.animator.cancel(),
                _ => {}
            }
        }
    }
}
