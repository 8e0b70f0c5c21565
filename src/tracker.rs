//! Route progress state machine for an active navigation session
//!
//! Owns the working route and the traveller's last matched position along
//! it, and decides on every fix whether to keep navigating, request a fresh
//! route or declare arrival. Route requests themselves are an external
//! effect: the tracker hands back a `RouteQuery` and is fed the outcome
//! through `route_received` / `route_failed`, so there is never more than
//! one request logically in flight and a response arriving after `stop` or
//! after a newer query is simply dropped.
use crate::error::ErrorKind;
use crate::gps::{distance, Coordinate};
use crate::services::routing::{flatten_first_leg, RouteQuery, RoutingResponse, TravelMode};
use log::{debug, trace, warn};

/// Distance in meters beyond which a fix counts as off the known route
pub const DEFAULT_DEVIATION_THRESHOLD_M: f64 = 70.0;

/// Distance in meters to the final route point that counts as arrival
///
/// Deliberately tighter than the deviation band so pulling up near the
/// destination is not confused with merely being close to the route.
pub const DEFAULT_ARRIVAL_THRESHOLD_M: f64 = 30.0;

/// A raw position report from the location provider
#[derive(Clone, Copy, Debug)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    /// Heading in degrees at the time of the fix
    pub bearing_deg: f64,
    pub timestamp_ms: u64,
}

/// Lifecycle of a navigation session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    /// No active route
    Idle,
    /// Route loaded, fixes are being matched against it
    Navigating,
    /// A route request is pending, progress updates are suppressed
    Rerouting,
    /// Terminal, the destination was reached
    Arrived,
}

/// Outbound notifications consumed by the presentation layer
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The not yet travelled part of the route, leading point first
    RouteUpdated(Vec<Coordinate>),
    /// New interpolated marker position
    MarkerMoved(Coordinate),
    /// The traveller left the route and a new one was requested
    ReroutingStarted,
    /// The destination was reached, the session is over
    Arrived,
    /// A non fatal failure the caller may react to
    Error { kind: ErrorKind, message: String },
}

/// Position along the current route, owned exclusively by the tracker
#[derive(Clone, Debug)]
struct ProgressState {
    route: Vec<Coordinate>,
    last_matched_index: usize,
    last_matched_distance_m: f64,
    /// Leading remaining point of the last emitted update, used to drop
    /// repeat emissions while the traveller sits between the same points
    last_emitted_start: Option<Coordinate>,
}

/// The state machine tracking progress along a previously computed route
#[derive(Debug)]
pub struct RouteProgressTracker {
    state: TrackerState,
    travel_mode: TravelMode,
    destination: Option<Coordinate>,
    progress: Option<ProgressState>,
    deviation_threshold_m: f64,
    arrival_threshold_m: f64,
    leg_distance_text: Option<String>,
    leg_duration_text: Option<String>,
}

impl RouteProgressTracker {
    pub fn new(travel_mode: TravelMode) -> Self {
        RouteProgressTracker::with_thresholds(
            travel_mode,
            DEFAULT_DEVIATION_THRESHOLD_M,
            DEFAULT_ARRIVAL_THRESHOLD_M,
        )
    }

    /// Create a tracker with custom deviation and arrival bands
    pub fn with_thresholds(
        travel_mode: TravelMode,
        deviation_threshold_m: f64,
        arrival_threshold_m: f64,
    ) -> Self {
        RouteProgressTracker {
            state: TrackerState::Idle,
            travel_mode,
            destination: None,
            progress: None,
            deviation_threshold_m,
            arrival_threshold_m,
            leg_distance_text: None,
            leg_duration_text: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Index of the route point the traveller was last matched to
    pub fn last_matched_index(&self) -> Option<usize> {
        self.progress.as_ref().map(|p| p.last_matched_index)
    }

    /// Human readable total distance of the current leg, if a route is loaded
    pub fn leg_distance_text(&self) -> Option<&str> {
        self.leg_distance_text.as_deref()
    }

    /// Human readable total duration of the current leg, if a route is loaded
    pub fn leg_duration_text(&self) -> Option<&str> {
        self.leg_duration_text.as_deref()
    }

    /// Begin a navigation session, yielding the first route request
    ///
    /// Returns `None` without side effects while a request is already
    /// pending, so re-entrant starts cannot stack requests.
    pub fn start_navigation(&mut self, start: Coordinate, end: Coordinate) -> Option<RouteQuery> {
        if self.state == TrackerState::Rerouting {
            warn!("ignoring start_navigation, a route request is already pending");
            return None;
        }
        debug!("starting navigation, requesting initial route");
        self.state = TrackerState::Rerouting;
        self.destination = Some(end);
        self.progress = None;
        Some(RouteQuery {
            origin: start,
            destination: end,
            travel_mode: self.travel_mode,
            initial_bearing_deg: 0.0,
        })
    }

    /// Adopt a routing response as the new working route
    ///
    /// Only honored while a request is pending; anything arriving later
    /// (after `stop` or after being superseded) is dropped. A response
    /// without usable geometry is rejected wholesale and surfaced as an
    /// error event, no partial route is ever adopted.
    pub fn route_received(&mut self, response: &RoutingResponse) -> Vec<Event> {
        if self.state != TrackerState::Rerouting {
            warn!("dropping routing response, no request is pending");
            return Vec::new();
        }

        match flatten_first_leg(response) {
            Ok(route) => {
                debug!("route adopted with {} points", route.len());
                // leg totals are display only, missing text is tolerated
                if let Some(leg) = response.first_leg() {
                    self.leg_distance_text = Some(leg.distance.text.clone());
                    self.leg_duration_text = Some(leg.duration.text.clone());
                }
                let first = route[0];
                self.progress = Some(ProgressState {
                    route: route.clone(),
                    last_matched_index: 0,
                    last_matched_distance_m: 0.0,
                    last_emitted_start: None,
                });
                self.state = TrackerState::Navigating;
                vec![Event::RouteUpdated(route), Event::MarkerMoved(first)]
            }
            Err(e) => self.route_failed(e.kind(), e.to_string()),
        }
    }

    /// Record a failed route request and fall back to idle
    pub fn route_failed(&mut self, kind: ErrorKind, message: String) -> Vec<Event> {
        if self.state != TrackerState::Rerouting {
            warn!("dropping routing failure, no request is pending");
            return Vec::new();
        }
        debug!("route request failed: {}", message);
        self.state = TrackerState::Idle;
        self.progress = None;
        vec![Event::Error { kind, message }]
    }

    /// Match a raw fix against the route and decide how to proceed
    ///
    /// Outside of `Navigating` this is a defensive no-op, which also makes
    /// position updates re-entrancy safe while a route request is pending.
    /// A returned query means the traveller deviated and a fresh route
    /// should be fetched from the fix to the original destination.
    pub fn on_position(&mut self, fix: &PositionFix) -> (Vec<Event>, Option<RouteQuery>) {
        if self.state != TrackerState::Navigating {
            trace!("ignoring position fix in state {:?}", self.state);
            return (Vec::new(), None);
        }
        // taken out of self for the duration of the match so transitions
        // below can mutate the rest of the tracker freely; restored on the
        // continue-navigating path only
        let mut progress = match self.progress.take() {
            Some(progress) => progress,
            None => return (Vec::new(), None),
        };

        // Nearest point search anchored at the last match. The scan only
        // moves forward so noisy fixes cannot drag the match backwards;
        // the anchor is only abandoned (search restarted from the head of
        // the route) once the traveller is clearly away from it.
        let route = &progress.route;
        let mut best_index = progress.last_matched_index;
        let mut best_distance = distance(&fix.coordinate, &route[best_index]);
        let scan_from = if best_distance > self.deviation_threshold_m {
            0
        } else {
            best_index + 1
        };
        for (offset, point) in route[scan_from..].iter().enumerate() {
            let d = distance(&fix.coordinate, point);
            if d < best_distance {
                best_distance = d;
                best_index = scan_from + offset;
            }
        }
        trace!(
            "fix matched to point {} at {:.1}m",
            best_index,
            best_distance
        );

        if best_distance > self.deviation_threshold_m {
            // off route, ask for a fresh route from where the traveller is
            debug!(
                "deviation of {:.1}m exceeds {:.1}m, rerouting",
                best_distance, self.deviation_threshold_m
            );
            self.state = TrackerState::Rerouting;
            let query = self.destination.map(|destination| RouteQuery {
                origin: fix.coordinate,
                destination,
                travel_mode: self.travel_mode,
                initial_bearing_deg: fix.bearing_deg,
            });
            return (vec![Event::ReroutingStarted], query);
        }

        progress.last_matched_index = best_index;
        progress.last_matched_distance_m = best_distance;

        let remaining = route.len() - best_index;
        let distance_to_end = route
            .last()
            .map(|end| distance(&fix.coordinate, end))
            .unwrap_or(0.0);
        if remaining <= 1 || distance_to_end <= self.arrival_threshold_m {
            debug!(
                "destination reached, {:.1}m from the final point",
                distance_to_end
            );
            self.state = TrackerState::Arrived;
            return (vec![Event::Arrived], None);
        }

        // only emit when the leading remaining point moved, repeat fixes
        // between the same pair of points change nothing for the consumer
        let leading = route[best_index];
        let events = if progress.last_emitted_start != Some(leading) {
            progress.last_emitted_start = Some(leading);
            vec![Event::RouteUpdated(route[best_index..].to_vec())]
        } else {
            Vec::new()
        };
        self.progress = Some(progress);
        (events, None)
    }

    /// End the session and drop all route state
    pub fn stop(&mut self) {
        debug!("navigation stopped");
        self.state = TrackerState::Idle;
        self.destination = None;
        self.progress = None;
        self.leg_distance_text = None;
        self.leg_duration_text = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyline::encode;
    use crate::services::routing::{CandidateRoute, RouteLeg, RouteStep, ValueText};

    // successive points ~100m apart heading north
    fn straight_route(points: usize) -> Vec<Coordinate> {
        (0..points)
            .map(|i| Coordinate::new(35.70 + 0.0009 * i as f64, 51.40))
            .collect()
    }

    fn response_for(route: &[Coordinate]) -> RoutingResponse {
        RoutingResponse {
            routes: vec![CandidateRoute {
                legs: vec![RouteLeg {
                    distance: ValueText {
                        value: 100.0 * route.len() as f64,
                        text: "1 km".to_string(),
                    },
                    duration: ValueText {
                        value: 60.0,
                        text: "1 min".to_string(),
                    },
                    steps: vec![RouteStep {
                        encoded_polyline: encode(route),
                        distance: ValueText::default(),
                        duration: ValueText::default(),
                    }],
                }],
            }],
        }
    }

    fn navigating_tracker(route: &[Coordinate]) -> RouteProgressTracker {
        let mut tracker = RouteProgressTracker::new(TravelMode::Car);
        let query = tracker
            .start_navigation(route[0], *route.last().unwrap())
            .unwrap();
        assert_eq!(query.travel_mode, TravelMode::Car);
        tracker.route_received(&response_for(route));
        assert_eq!(tracker.state(), TrackerState::Navigating);
        tracker
    }

    fn fix_at(point: Coordinate) -> PositionFix {
        PositionFix {
            coordinate: point,
            bearing_deg: 0.0,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn start_navigation_requests_a_route_and_suppresses_reentry() {
        let route = straight_route(10);
        let mut tracker = RouteProgressTracker::new(TravelMode::Car);
        let query = tracker.start_navigation(route[0], route[9]);
        assert!(query.is_some());
        assert_eq!(tracker.state(), TrackerState::Rerouting);
        // a second start while the request is pending is a no-op
        assert!(tracker.start_navigation(route[0], route[9]).is_none());
    }

    #[test]
    fn route_received_emits_full_route_and_initial_marker() {
        let route = straight_route(10);
        let mut tracker = RouteProgressTracker::new(TravelMode::Car);
        tracker.start_navigation(route[0], route[9]);
        let events = tracker.route_received(&response_for(&route));

        assert_eq!(events.len(), 2);
        match &events[0] {
            Event::RouteUpdated(points) => assert_eq!(points.len(), 10),
            other => panic!("expected RouteUpdated, got {:?}", other),
        }
        assert_eq!(events[1], Event::MarkerMoved(route[0]));
        assert_eq!(tracker.leg_distance_text(), Some("1 km"));
        assert_eq!(tracker.leg_duration_text(), Some("1 min"));
    }

    #[test]
    fn fix_on_a_route_point_matches_that_index() {
        let route = straight_route(10);
        let mut tracker = navigating_tracker(&route);

        let (events, query) = tracker.on_position(&fix_at(route[4]));
        assert!(query.is_none());
        assert_eq!(tracker.last_matched_index(), Some(4));
        match &events[0] {
            Event::RouteUpdated(points) => {
                assert_eq!(points.len(), 6);
                assert_eq!(points[0], route[4]);
                assert_eq!(*points.last().unwrap(), route[9]);
            }
            other => panic!("expected RouteUpdated, got {:?}", other),
        }
    }

    #[test]
    fn matched_index_does_not_move_backwards() {
        let route = straight_route(10);
        let mut tracker = navigating_tracker(&route);

        tracker.on_position(&fix_at(route[5]));
        assert_eq!(tracker.last_matched_index(), Some(5));
        // a fix geometrically closer to point 4, but still within the
        // deviation band of the anchor, must not drag the match back
        let noisy = Coordinate::new(35.7039, 51.40);
        tracker.on_position(&fix_at(noisy));
        assert_eq!(tracker.last_matched_index(), Some(5));
    }

    #[test]
    fn repeat_fix_between_the_same_points_emits_nothing() {
        let route = straight_route(10);
        let mut tracker = navigating_tracker(&route);

        let (first, _) = tracker.on_position(&fix_at(route[4]));
        assert!(!first.is_empty());
        let (second, _) = tracker.on_position(&fix_at(route[4]));
        assert!(second.is_empty());
    }

    #[test]
    fn deviation_triggers_rerouting_with_the_fix_as_origin() {
        let route = straight_route(10);
        let mut tracker = navigating_tracker(&route);

        // ~200m east of the route, perpendicular to the heading
        let off_route = Coordinate::new(35.7018, 51.4022);
        let fix = PositionFix {
            coordinate: off_route,
            bearing_deg: 42.0,
            timestamp_ms: 0,
        };
        let (events, query) = tracker.on_position(&fix);

        assert_eq!(events, vec![Event::ReroutingStarted]);
        assert_eq!(tracker.state(), TrackerState::Rerouting);
        let query = query.expect("a reroute query");
        assert_eq!(query.origin, off_route);
        assert_eq!(query.destination, route[9]);
        assert_eq!(query.initial_bearing_deg, 42.0);

        // progress updates are suppressed while the request is in flight
        let (events, query) = tracker.on_position(&fix_at(route[4]));
        assert!(events.is_empty());
        assert!(query.is_none());
    }

    #[test]
    fn arrival_inside_the_band_emits_arrived_once() {
        let route = straight_route(10);
        let mut tracker = navigating_tracker(&route);

        // ~10m short of the final point
        let near_end = Coordinate::new(
            route[9].latitude() - 0.0001,
            route[9].longitude(),
        );
        let (events, query) = tracker.on_position(&fix_at(near_end));
        assert_eq!(events, vec![Event::Arrived]);
        assert!(query.is_none());
        assert_eq!(tracker.state(), TrackerState::Arrived);

        // terminal state, further fixes are no-ops
        let (events, query) = tracker.on_position(&fix_at(route[0]));
        assert!(events.is_empty());
        assert!(query.is_none());
        assert_eq!(tracker.state(), TrackerState::Arrived);
    }

    #[test]
    fn empty_response_falls_back_to_idle() {
        let route = straight_route(10);
        let mut tracker = RouteProgressTracker::new(TravelMode::Car);
        tracker.start_navigation(route[0], route[9]);

        let events = tracker.route_received(&RoutingResponse { routes: vec![] });
        assert_eq!(tracker.state(), TrackerState::Idle);
        match &events[0] {
            Event::Error { kind, .. } => assert_eq!(*kind, ErrorKind::EmptyRoute),
            other => panic!("expected Error, got {:?}", other),
        }
        // the caller may retry from idle
        assert!(tracker.start_navigation(route[0], route[9]).is_some());
    }

    #[test]
    fn broken_step_geometry_is_not_adopted() {
        let route = straight_route(10);
        let mut tracker = RouteProgressTracker::new(TravelMode::Car);
        tracker.start_navigation(route[0], route[9]);

        let mut response = response_for(&route);
        response.routes[0].legs[0].steps[0].encoded_polyline.pop();
        let events = tracker.route_received(&response);
        assert_eq!(tracker.state(), TrackerState::Idle);
        match &events[0] {
            Event::Error { kind, .. } => assert_eq!(*kind, ErrorKind::MalformedEncoding),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn position_before_start_is_a_no_op() {
        let route = straight_route(10);
        let mut tracker = RouteProgressTracker::new(TravelMode::Car);
        let (events, query) = tracker.on_position(&fix_at(route[0]));
        assert!(events.is_empty());
        assert!(query.is_none());
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn stale_response_after_stop_is_dropped() {
        let route = straight_route(10);
        let mut tracker = RouteProgressTracker::new(TravelMode::Car);
        tracker.start_navigation(route[0], route[9]);
        tracker.stop();

        let events = tracker.route_received(&response_for(&route));
        assert!(events.is_empty());
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn reroute_response_resets_the_matched_index() {
        let route = straight_route(10);
        let mut tracker = navigating_tracker(&route);
        tracker.on_position(&fix_at(route[6]));
        assert_eq!(tracker.last_matched_index(), Some(6));

        // wander off and adopt the replacement route
        let (_, query) = tracker.on_position(&fix_at(Coordinate::new(35.7018, 51.4022)));
        assert!(query.is_some());
        let fresh = straight_route(5);
        tracker.route_received(&response_for(&fresh));
        assert_eq!(tracker.state(), TrackerState::Navigating);
        assert_eq!(tracker.last_matched_index(), Some(0));
    }
}
