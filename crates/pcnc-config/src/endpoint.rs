use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Declarative configuration for the controller's command channel.
///
/// Serialises as its URL form. Deserialisation accepts either the URL form or
/// a table tagged by `transport`, so configuration files may use
/// `endpoint = "tcp://127.0.0.1:9000"` or
/// `endpoint = { transport = "tcp", host = "127.0.0.1", port = 9000 }`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "EndpointRepr", into = "String")]
pub enum ControllerEndpoint {
    /// Local named pipe, addressed by its short name (for example `PlanetCNC`).
    Pipe { name: String },
    /// Socket file bridged to the controller host.
    Unix { path: Utf8PathBuf },
    /// Controller reachable over the network.
    Tcp { host: String, port: u16 },
}

impl ControllerEndpoint {
    /// Controller channel on the named pipe `name`.
    #[must_use]
    pub fn pipe(name: impl Into<String>) -> Self {
        Self::Pipe { name: name.into() }
    }

    /// Controller channel at a socket file.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Controller channel at `host:port`.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Socket file path, for socket-file endpoints only.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Pipe { .. } | Self::Tcp { .. } => None,
        }
    }

    /// Returns the full Windows pipe path (`\\.\pipe\<name>`) for pipe endpoints.
    #[must_use]
    pub fn pipe_path(&self) -> Option<String> {
        match self {
            Self::Pipe { name } => Some(format!(r"\\.\pipe\{name}")),
            Self::Unix { .. } | Self::Tcp { .. } => None,
        }
    }
}

impl fmt::Display for ControllerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipe { name } => write!(formatter, "pipe:{name}"),
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for ControllerEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "pipe" => {
                // Accept both `pipe:NAME` and `pipe://NAME`.
                let name = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .unwrap_or_else(|| url.path().trim_matches('/'));
                if name.is_empty() {
                    return Err(EndpointParseError::MissingPipeName(input.to_owned()));
                }
                Ok(Self::pipe(name))
            }
            "unix" => {
                let path = url.path();
                if path.is_empty() {
                    return Err(EndpointParseError::MissingUnixPath(input.to_owned()));
                }
                Ok(Self::unix(path))
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
                let port = url
                    .port()
                    .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
                Ok(Self::tcp(host, port))
            }
            _ => Err(EndpointParseError::UnsupportedScheme(input.to_owned())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Url(String),
    Table(EndpointTable),
}

#[derive(Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
enum EndpointTable {
    Pipe { name: String },
    Unix { path: Utf8PathBuf },
    Tcp { host: String, port: u16 },
}

impl TryFrom<EndpointRepr> for ControllerEndpoint {
    type Error = EndpointParseError;

    fn try_from(repr: EndpointRepr) -> Result<Self, Self::Error> {
        match repr {
            EndpointRepr::Url(text) => text.parse(),
            EndpointRepr::Table(EndpointTable::Pipe { name }) => Ok(Self::pipe(name)),
            EndpointRepr::Table(EndpointTable::Unix { path }) => Ok(Self::unix(path)),
            EndpointRepr::Table(EndpointTable::Tcp { host, port }) => Ok(Self::tcp(host, port)),
        }
    }
}

impl From<ControllerEndpoint> for String {
    fn from(endpoint: ControllerEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Why a controller endpoint string was refused.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Only `pipe`, `unix` and `tcp` address a controller.
    #[error("controller endpoint '{0}' must use pipe:, unix:// or tcp://")]
    UnsupportedScheme(String),
    #[error("controller endpoint '{0}' names no pipe")]
    MissingPipeName(String),
    #[error("controller endpoint '{0}' names no host")]
    MissingHost(String),
    #[error("controller endpoint '{0}' has no port")]
    MissingPort(String),
    #[error("controller endpoint '{0}' has no socket path")]
    MissingUnixPath(String),
    /// The text is not a URL at all.
    #[error("controller endpoint is not a URL: {0}")]
    Url(#[from] url::ParseError),
}
