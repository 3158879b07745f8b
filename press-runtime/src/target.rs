use crate::error::RuntimeError;
use press_core::DEFAULT_HTTP_PORT;
use std::str::FromStr;

/// The `host[:port]` positional argument.
///
/// The port is kept as written since scripts receive it verbatim; only the network client needs
/// it as a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: String,
}

impl Target {
    /// Port for the network client. A missing or zero port means the default HTTP port.
    pub fn port_number(&self) -> Result<u16, RuntimeError> {
        if self.port.is_empty() {
            return Ok(DEFAULT_HTTP_PORT);
        }
        match self.port.parse::<u16>() {
            Ok(0) => Ok(DEFAULT_HTTP_PORT),
            Ok(port) => Ok(port),
            Err(_) => Err(RuntimeError::InvalidPort(self.port.clone())),
        }
    }
}

impl FromStr for Target {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s.split_once(':').unwrap_or((s, ""));
        if host.is_empty() || port.contains(':') {
            return Err(RuntimeError::InvalidAddress(s.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port: port.to_string(),
        })
    }
}
