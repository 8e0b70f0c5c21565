//! Defines the general error type for the crate and various conversions into it
use std::convert;
use std::fmt;

/// Broad error categories surfaced to the presentation layer in events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedEncoding,
    RoutingService,
    EmptyRoute,
    Configuration,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedEncoding => write!(f, "malformed-encoding"),
            ErrorKind::RoutingService => write!(f, "routing-service"),
            ErrorKind::EmptyRoute => write!(f, "empty-route"),
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

/// General error type for the crate
#[derive(Debug)]
pub enum Error {
    /// Encoded polyline stream ended mid value or held an invalid byte
    MalformedEncoding(String),
    /// Routing service responded with a non-success HTTP status
    RoutingRequestError(reqwest::StatusCode, String),
    /// Routing service could not be reached or failed in transit
    RoutingServiceError(String),
    /// Routing service answered but returned no usable legs or steps
    EmptyRouteError(String),
    /// A replayed position fix record could not be parsed
    InvalidFixRecord(String),
    InvalidConfigurationValue(String),
    UnknownServiceHandler(String),
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Other(String),
}

impl Error {
    /// Map the error onto the category reported in outbound events
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedEncoding(_) => ErrorKind::MalformedEncoding,
            Error::RoutingRequestError(_, _) | Error::RoutingServiceError(_) => {
                ErrorKind::RoutingService
            }
            Error::EmptyRouteError(_) => ErrorKind::EmptyRoute,
            Error::InvalidConfigurationValue(_) | Error::UnknownServiceHandler(_) => {
                ErrorKind::Configuration
            }
            Error::InvalidFixRecord(_) | Error::Io(_) | Error::Yaml(_) | Error::Other(_) => {
                ErrorKind::Other
            }
        }
    }
}

impl convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl convert::From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

impl convert::From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::RoutingServiceError(err.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedEncoding(msg) => {
                write!(f, "Malformed polyline encoding: {}", msg)
            }
            Error::RoutingRequestError(code, msg) => write!(
                f,
                "Routing request failed with code: {} - {}",
                code, msg
            ),
            Error::RoutingServiceError(msg) => {
                write!(f, "Routing service failure: {}", msg)
            }
            Error::EmptyRouteError(msg) => {
                write!(f, "Routing response contained no usable route: {}", msg)
            }
            Error::InvalidFixRecord(msg) => write!(f, "Invalid position fix record: {}", msg),
            Error::InvalidConfigurationValue(msg) => write!(f, "{}", msg),
            Error::UnknownServiceHandler(msg) => write!(f, "{}", msg),
            Error::Io(e) => write!(f, "{}", e),
            Error::Yaml(e) => write!(f, "{}", e),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}
