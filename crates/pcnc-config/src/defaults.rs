use crate::endpoint::ControllerEndpoint;
use crate::logging::LogFormat;

/// Pipe name the controller listens on.
pub const DEFAULT_PIPE_NAME: &str = "PlanetCNC";

/// Bound on the initial connection attempt, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 200;

/// Log filter applied when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned [`DEFAULT_LOG_FILTER`] for configuration defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Compact single-line logs unless configured otherwise.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Controller endpoint for the host platform.
///
/// Windows controllers listen on the `PlanetCNC` named pipe. Elsewhere the
/// channel is a Unix socket, normally bridged from the controller host, at
/// `<runtime dir>/planetcnc/planetcnc.sock`. Without a runtime directory the
/// socket lives under the temporary directory in a per-user subdirectory.
#[must_use]
pub fn default_endpoint() -> ControllerEndpoint {
    #[cfg(unix)]
    {
        ControllerEndpoint::unix(unix::socket_path())
    }
    #[cfg(not(unix))]
    {
        ControllerEndpoint::pipe(DEFAULT_PIPE_NAME)
    }
}

#[cfg(unix)]
mod unix {
    use camino::Utf8PathBuf;

    const SOCKET_DIR: &str = "planetcnc";
    const SOCKET_FILE: &str = "planetcnc.sock";

    pub(super) fn socket_path() -> Utf8PathBuf {
        let runtime = dirs::runtime_dir().and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
        let mut path = match runtime {
            Some(dir) => dir.join(SOCKET_DIR),
            None => shared_temp_dir().join(SOCKET_DIR).join(user_scope()),
        };
        path.push(SOCKET_FILE);
        path
    }

    fn shared_temp_dir() -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
    }

    // The temporary directory is shared between users.
    fn user_scope() -> String {
        // SAFETY: `geteuid` has no preconditions and cannot fail.
        let uid = unsafe { libc::geteuid() };
        format!("uid-{uid}")
    }
}

