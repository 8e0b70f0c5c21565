//! Define the application's command line interface
use crate::config::Config;
use crate::error::Error;
use crate::gps::Coordinate;
use simplelog::LevelFilter;
use structopt::StructOpt;

mod decode;
use decode::{decode_command, DecodeOpts};
mod replay;
use replay::{replay_command, ReplayOpts};

/// Track progress along a navigation route from recorded or live GPS fixes
#[derive(Debug, StructOpt)]
pub struct Cli {
    /// Set logging level to debug, use a second time (e.g. -vv) to set logging to trace
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,
    /// Suppress info logging messages use a second time (e.g. -qq) to hide warnings
    #[structopt(short, long, parse(from_occurrences))]
    quiet: i32,
    /// Subcommand to execute
    #[structopt(subcommand)]
    cmd: Command,
}

impl Cli {
    /// Return the verbose flag counts as a log level filter
    pub fn verbosity(&self, default: LevelFilter) -> LevelFilter {
        if self.quiet == 1 {
            LevelFilter::Warn
        } else if self.quiet > 1 {
            LevelFilter::Error
        } else if self.verbose == 1 {
            LevelFilter::Debug
        } else if self.verbose == 2 {
            LevelFilter::Trace
        } else if self.verbose > 2 {
            LevelFilter::Off
        } else {
            default
        }
    }

    /// Consume options struct and return the result of subcommand execution
    pub fn execute_subcommand(self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        self.cmd.execute(config)
    }
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Replay a recorded fix log through a navigation session
    #[structopt(name = "replay")]
    Replay(ReplayOpts),
    /// Expand an encoded polyline into coordinates (or the reverse)
    #[structopt(name = "decode")]
    Decode(DecodeOpts),
}

impl Command {
    /// Consume enum variant and return the result of the command's execution
    fn execute(self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Command::Replay(opts) => replay_command(config, opts),
            Command::Decode(opts) => decode_command(opts),
        }
    }
}

/// Parse a "lat,lon" argument into a coordinate
fn parse_coordinate(src: &str) -> Result<Coordinate, Error> {
    let mut parts = src.splitn(2, ',');
    let latitude = parts.next().unwrap_or_default().trim();
    let longitude = parts.next().unwrap_or_default().trim();
    match (latitude.parse::<f64>(), longitude.parse::<f64>()) {
        (Ok(latitude), Ok(longitude)) => Ok(Coordinate::new(latitude, longitude)),
        _ => Err(Error::Other(format!(
            "expected a 'lat,lon' pair, got: {}",
            src
        ))),
    }
}
