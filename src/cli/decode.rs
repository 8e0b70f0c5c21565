//! Define the polyline decode/encode utility command
use super::parse_coordinate;
use crate::error::Error;
use crate::gps::Coordinate;
use crate::polyline;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use structopt::StructOpt;

/// Expand an encoded polyline into "lat,lon" lines, or encode the reverse
#[derive(Debug, StructOpt)]
pub struct DecodeOpts {
    /// Encoded polyline string, omit when encoding with --encode
    #[structopt(name = "POLYLINE", required_unless = "encode")]
    encoded: Option<String>,
    /// Encode a file of "lat,lon" lines instead of decoding
    #[structopt(long, parse(from_os_str))]
    encode: Option<PathBuf>,
}

/// Implementation of the `decode` subcommand
pub fn decode_command(opts: DecodeOpts) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = opts.encode {
        let points = read_points(&path)?;
        println!("{}", polyline::encode(&points));
        return Ok(());
    }

    // structopt enforces the positional argument when --encode is absent
    let encoded = opts.encoded.unwrap_or_default();
    for point in polyline::decode(&encoded)? {
        println!("{:.5},{:.5}", point.latitude(), point.longitude());
    }
    Ok(())
}

fn read_points(path: &PathBuf) -> Result<Vec<Coordinate>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut points = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        points.push(parse_coordinate(line)?);
    }
    Ok(points)
}
