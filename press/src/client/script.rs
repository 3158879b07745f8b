use crate::client::{Client, ClientError, Response};
use mlua::{Function, Lua, MultiValue};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

mod socket;

/// Global every script must define: `request(host, port, args) -> status, size`.
pub const ENTRY_POINT: &str = "request";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("unable to read script {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to prepare interpreter: {0}")]
    Setup(#[source] mlua::Error),

    #[error("unable to load script: {0}")]
    Load(#[source] mlua::Error),

    #[error("script does not define a `request` function")]
    MissingEntryPoint,

    #[error("`request` raised an error: {0}")]
    Call(#[source] mlua::Error),

    #[error("`request` must return exactly two values (status, size), got {0}")]
    ReturnArity(usize),

    #[error("`request` returned a non-integer status or size: {0}")]
    ReturnType(#[source] mlua::Error),

    #[error("script task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Runs a user-supplied Lua handler once per attempt.
///
/// Each attempt gets a brand-new interpreter on the blocking thread pool: the script is loaded,
/// `request(host, port, args)` is called, and the interpreter is dropped before the result is
/// returned. Nothing survives between calls, so concurrent workers never see each other's state.
///
/// The interpreter has the `socket` module preloaded (also reachable through
/// `require("socket")`):
///
/// ```lua
/// function request(host, port, args)
///     local conn = socket.tcp()
///     conn:settimeout(5)
///     local ok, err = conn:connect(host, tonumber(port))
///     if not ok then return -1, 0 end
///     conn:send("GET /" .. args .. " HTTP/1.0\r\nHost: " .. host .. "\r\n\r\n")
///     local line = conn:receive("*l")
///     local body = conn:receive("*a") or ""
///     conn:close()
///     return tonumber(line:match("HTTP/%d%.%d (%d+)")), #body
/// end
/// ```
#[derive(Debug, Clone)]
pub struct ScriptClient {
    invocation: Arc<Invocation>,
}

#[derive(Debug)]
struct Invocation {
    script: PathBuf,
    host: String,
    port: String,
    args: String,
}

impl ScriptClient {
    pub fn new(
        script: impl Into<PathBuf>,
        host: impl Into<String>,
        port: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            invocation: Arc::new(Invocation {
                script: script.into(),
                host: host.into(),
                port: port.into(),
                args: args.into(),
            }),
        }
    }

    pub fn script(&self) -> &Path {
        &self.invocation.script
    }
}

impl Client for ScriptClient {
    async fn attempt(&self) -> Result<Response, ClientError> {
        let invocation = self.invocation.clone();
        let (status_code, content_length) = tokio::task::spawn_blocking(move || invocation.run())
            .await
            .map_err(ScriptError::from)??;

        Ok(Response::new(status_code, content_length))
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

impl Invocation {
    fn run(&self) -> Result<(i32, i64), ScriptError> {
        let source = std::fs::read(&self.script).map_err(|source| ScriptError::Read {
            path: self.script.clone(),
            source,
        })?;

        let lua = Lua::new();
        socket::preload(&lua).map_err(ScriptError::Setup)?;

        lua.load(source.as_slice())
            .set_name(self.script.to_string_lossy())
            .exec()
            .map_err(ScriptError::Load)?;

        let request: Function = lua
            .globals()
            .get(ENTRY_POINT)
            .map_err(|_| ScriptError::MissingEntryPoint)?;

        let values: MultiValue = request
            .call((self.host.as_str(), self.port.as_str(), self.args.as_str()))
            .map_err(ScriptError::Call)?;

        let count = values.len();
        let mut values = values.into_iter();
        let (Some(status), Some(size), None) = (values.next(), values.next(), values.next()) else {
            return Err(ScriptError::ReturnArity(count));
        };

        let status_code: i32 = lua.unpack(status).map_err(ScriptError::ReturnType)?;
        let content_length: i64 = lua.unpack(size).map_err(ScriptError::ReturnType)?;

        trace!(status_code, content_length, "{} returned", ENTRY_POINT);
        Ok((status_code, content_length))
    }
}
