//! Define the fix log replay command
use super::parse_coordinate;
use crate::config::Config;
use crate::error::Error;
use crate::gps::Coordinate;
use crate::tracker::{Event, PositionFix, TrackerState};
use crate::NavigationSession;
use chrono::DateTime;
use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use structopt::StructOpt;

/// Replay recorded position fixes against the configured routing service
#[derive(Debug, StructOpt)]
pub struct ReplayOpts {
    /// Fix log with one "timestamp,lat,lon,bearing" record per line
    #[structopt(name = "FIX_LOG", parse(from_os_str))]
    fix_log: PathBuf,
    /// Navigation start point as "lat,lon", defaults to the first fix
    #[structopt(long, parse(try_from_str = parse_coordinate))]
    from: Option<Coordinate>,
    /// Navigation destination as "lat,lon"
    #[structopt(long, parse(try_from_str = parse_coordinate))]
    to: Coordinate,
}

/// Implementation of the `replay` subcommand
pub fn replay_command(config: Config, opts: ReplayOpts) -> Result<(), Box<dyn std::error::Error>> {
    let fixes = read_fix_log(&opts.fix_log)?;
    if fixes.is_empty() {
        return Err(Box::new(Error::Other(format!(
            "fix log holds no records: {:?}",
            opts.fix_log
        ))));
    }
    let start = opts.from.unwrap_or(fixes[0].coordinate);

    let mut session = NavigationSession::from_config(&config)?;
    log_events(&session.start_navigation(start, opts.to));
    if session.state() != TrackerState::Navigating {
        return Err(Box::new(Error::Other(
            "could not fetch an initial route".to_string(),
        )));
    }
    info!(
        "route loaded, leg distance {} and duration {}",
        session.tracker().leg_distance_text().unwrap_or("n/a"),
        session.tracker().leg_duration_text().unwrap_or("n/a")
    );

    for fix in &fixes {
        log_events(&session.on_position(*fix));
        if let Some(event) = session.tick(fix.timestamp_ms) {
            log_events(&[event]);
        }
        if session.state() == TrackerState::Arrived {
            break;
        }
    }

    if session.state() != TrackerState::Arrived {
        warn!("fix log ended before the destination was reached");
    }
    session.stop();
    Ok(())
}

fn log_events(events: &[Event]) {
    for event in events {
        match event {
            Event::RouteUpdated(points) => info!("route updated, {} points remain", points.len()),
            Event::MarkerMoved(position) => info!(
                "marker at {:.6},{:.6}",
                position.latitude(),
                position.longitude()
            ),
            Event::ReroutingStarted => info!("left the route, requesting a new one"),
            Event::Arrived => info!("arrived at the destination"),
            Event::Error { kind, message } => warn!("{}: {}", kind, message),
        }
    }
}

/// Parse a fix log into position fixes, one "timestamp,lat,lon,bearing"
/// record per line
///
/// Timestamps are RFC3339 or plain unix milliseconds; blank lines and lines
/// starting with '#' are skipped.
fn read_fix_log(path: &PathBuf) -> Result<Vec<PositionFix>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut fixes = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        fixes.push(parse_fix_record(line).map_err(|e| {
            Error::InvalidFixRecord(format!("{:?} line {}: {}", path, number + 1, e))
        })?);
    }
    Ok(fixes)
}

fn parse_fix_record(line: &str) -> Result<PositionFix, Error> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(Error::InvalidFixRecord(
            "expected timestamp,lat,lon,bearing".to_string(),
        ));
    }

    let timestamp_ms = match fields[0].parse::<u64>() {
        Ok(millis) => millis,
        Err(_) => {
            let millis = DateTime::parse_from_rfc3339(fields[0])
                .map_err(|e| Error::InvalidFixRecord(format!("bad timestamp: {}", e)))?
                .timestamp_millis();
            if millis < 0 {
                return Err(Error::InvalidFixRecord(format!(
                    "timestamp predates the unix epoch: {}",
                    fields[0]
                )));
            }
            millis as u64
        }
    };
    let latitude = fields[1]
        .parse::<f64>()
        .map_err(|e| Error::InvalidFixRecord(format!("bad latitude: {}", e)))?;
    let longitude = fields[2]
        .parse::<f64>()
        .map_err(|e| Error::InvalidFixRecord(format!("bad longitude: {}", e)))?;
    let bearing_deg = fields[3]
        .parse::<f64>()
        .map_err(|e| Error::InvalidFixRecord(format!("bad bearing: {}", e)))?;

    Ok(PositionFix {
        coordinate: Coordinate::new(latitude, longitude),
        bearing_deg,
        timestamp_ms,
    })
}
