//! Encode and decode route geometries in the compact polyline format
//!
//! Routing responses carry step geometry as delta coded, base-64 like text
//! at the standard 1e5 precision. Every call is independent, the codec keeps
//! no state between invocations.
use crate::error::Error;
use crate::gps::Coordinate;

/// Fixed precision factor of the standard encoding
const PRECISION: f64 = 1e5;

/// Decode an encoded polyline string into an ordered coordinate sequence
///
/// An empty input yields an empty sequence. A stream that terminates in the
/// middle of a value, or that contains a byte outside the encodable range,
/// fails with `Error::MalformedEncoding` rather than silently truncating.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, Error> {
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::new();
    let mut pos = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while pos < bytes.len() {
        lat += decode_value(bytes, &mut pos)?;
        if pos >= bytes.len() {
            return Err(Error::MalformedEncoding(
                "stream ended after a latitude delta with no longitude".to_string(),
            ));
        }
        lon += decode_value(bytes, &mut pos)?;
        coordinates.push(Coordinate::new(
            lat as f64 / PRECISION,
            lon as f64 / PRECISION,
        ));
    }

    Ok(coordinates)
}

/// Encode a coordinate sequence into the compact polyline format
pub fn encode(coordinates: &[Coordinate]) -> String {
    let mut encoded = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for coordinate in coordinates {
        let lat = (coordinate.latitude() * PRECISION).round() as i64;
        let lon = (coordinate.longitude() * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut encoded);
        encode_value(lon - prev_lon, &mut encoded);
        prev_lat = lat;
        prev_lon = lon;
    }

    encoded
}

/// Decode a single zigzag encoded delta starting at `pos`
fn decode_value(bytes: &[u8], pos: &mut usize) -> Result<i64, Error> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        if *pos >= bytes.len() {
            return Err(Error::MalformedEncoding(format!(
                "stream ended mid value at byte {}",
                pos
            )));
        }
        let byte = bytes[*pos];
        if !(63..=126).contains(&byte) {
            return Err(Error::MalformedEncoding(format!(
                "invalid byte 0x{:02x} at offset {}",
                byte, pos
            )));
        }
        *pos += 1;
        // a well formed delta never needs more chunks than an i64 holds
        if shift >= 64 {
            return Err(Error::MalformedEncoding(format!(
                "continuation run exceeds 64 bits at offset {}",
                pos
            )));
        }
        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        if chunk < 0x20 {
            break;
        }
        shift += 5;
    }

    // zigzag back to a signed delta
    if result & 1 != 0 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}

/// Append one zigzag encoded delta to the output string
fn encode_value(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };

    while value >= 0x20 {
        out.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
        value >>= 5;
    }
    out.push((value as u8 + 63) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_empty_string_yields_no_points() {
        let points = decode("").unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn decode_reference_polyline() {
        // the reference example from the encoding specification
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = [
            Coordinate::new(38.5, -120.2),
            Coordinate::new(40.7, -120.95),
            Coordinate::new(43.252, -126.453),
        ];
        assert_eq!(points, expected);
    }

    #[test]
    fn round_trip_preserves_points() {
        let route = vec![
            Coordinate::new(35.69982, 51.34162),
            Coordinate::new(35.70113, 51.34418),
            Coordinate::new(35.70297, 51.34590),
            Coordinate::new(35.70297, 51.34590),
            Coordinate::new(-12.00001, -77.00002),
        ];
        let decoded = decode(&encode(&route)).unwrap();
        assert_eq!(decoded.len(), route.len());
        for (got, want) in decoded.iter().zip(route.iter()) {
            assert!((got.latitude() - want.latitude()).abs() < 1e-5);
            assert!((got.longitude() - want.longitude()).abs() < 1e-5);
        }
    }

    #[test]
    fn decode_fails_on_truncated_stream() {
        // drop the final byte so the last value never terminates
        let mut encoded = encode(&[Coordinate::new(38.5, -120.2)]);
        encoded.pop();
        assert!(matches!(
            decode(&encoded),
            Err(Error::MalformedEncoding(_))
        ));
    }

    #[test]
    fn decode_fails_on_missing_longitude() {
        // a single complete value is a latitude delta with no pair
        let encoded = "_p~iF";
        assert!(matches!(
            decode(encoded),
            Err(Error::MalformedEncoding(_))
        ));
    }

    #[test]
    fn decode_fails_on_unterminated_continuation_run() {
        // every byte flags a continuation, so the value never ends and the
        // accumulated shift would run past the width of the delta type
        let encoded = "~".repeat(15);
        assert!(matches!(
            decode(&encoded),
            Err(Error::MalformedEncoding(_))
        ));
    }

    #[test]
    fn decode_fails_on_invalid_byte() {
        assert!(matches!(
            decode("_p~iF\u{1}~ps|U"),
            Err(Error::MalformedEncoding(_))
        ));
    }
}
