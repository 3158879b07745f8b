//! Minimal LuaSocket-compatible `socket` module handed to scripts.
//!
//! Calls run on the blocking thread pool, so the sockets here are plain blocking streams. As in
//! LuaSocket, failures are returned as `nil, message` instead of being raised.
use mlua::{Lua, Table, UserData, UserDataMethods, Value};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(super) fn preload(lua: &Lua) -> mlua::Result<()> {
    let socket = lua.create_table()?;

    socket.set("tcp", lua.create_function(|_, ()| Ok(TcpSocket::default()))?)?;
    socket.set(
        "gettime",
        lua.create_function(|_, ()| {
            Ok(SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|now| now.as_secs_f64())
                .unwrap_or_default())
        })?,
    )?;
    socket.set(
        "sleep",
        lua.create_function(|_, secs: f64| {
            if let Some(duration) = seconds(secs) {
                std::thread::sleep(duration);
            }
            Ok(())
        })?,
    )?;

    let loaded: Table = lua.globals().get::<_, Table>("package")?.get("loaded")?;
    loaded.set("socket", socket.clone())?;
    lua.globals().set("socket", socket)
}

#[derive(Default)]
struct TcpSocket {
    stream: Option<BufReader<TcpStream>>,
    timeout: Option<Duration>,
}

enum Pattern {
    Line,
    All,
    Bytes(usize),
}

impl TcpSocket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        let stream = match self.timeout {
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in (host, port).to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(last_err.unwrap_or_else(|| {
                            io::Error::new(io::ErrorKind::NotFound, "host not found")
                        }))
                    }
                }
            }
            None => TcpStream::connect((host, port))?,
        };

        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.timeout = timeout;
        if let Some(stream) = &self.stream {
            stream.get_ref().set_read_timeout(timeout)?;
            stream.get_ref().set_write_timeout(timeout)?;
        }
        Ok(())
    }

    fn stream(&mut self) -> io::Result<&mut BufReader<TcpStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "closed"))
    }

    fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        self.stream()?.get_mut().write_all(data)?;
        Ok(data.len())
    }

    fn receive(&mut self, pattern: Pattern) -> io::Result<Vec<u8>> {
        let stream = self.stream()?;
        let mut buf = vec![];
        match pattern {
            Pattern::Line => {
                if stream.read_until(b'\n', &mut buf)? == 0 {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
                }
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
            }
            Pattern::All => {
                stream.read_to_end(&mut buf)?;
            }
            Pattern::Bytes(len) => {
                // The length comes from the script; only grow as bytes arrive.
                stream.by_ref().take(len as u64).read_to_end(&mut buf)?;
                if buf.len() < len {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
                }
            }
        }
        Ok(buf)
    }
}

impl UserData for TcpSocket {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_method_mut("settimeout", |_, this, secs: Option<f64>| {
            Ok(status(this.set_timeout(secs.and_then(seconds)).map(|()| 1)))
        });

        methods.add_method_mut("connect", |_, this, (host, port): (String, u16)| {
            Ok(status(this.connect(&host, port).map(|()| 1)))
        });

        methods.add_method_mut("send", |_, this, data: mlua::String<'lua>| {
            Ok(status(this.send(data.as_bytes())))
        });

        methods.add_method_mut("receive", |lua, this, pattern: Option<Value<'lua>>| {
            let pattern = parse_pattern(pattern)?;
            match this.receive(pattern) {
                Ok(bytes) => Ok((Some(lua.create_string(bytes)?), None)),
                Err(err) => Ok((None, Some(err.to_string()))),
            }
        });

        methods.add_method_mut("close", |_, this, ()| {
            this.stream = None;
            Ok(1)
        });
    }
}

fn parse_pattern(pattern: Option<Value<'_>>) -> mlua::Result<Pattern> {
    match pattern {
        None | Some(Value::Nil) => Ok(Pattern::Line),
        Some(Value::Integer(len)) if len >= 0 => Ok(Pattern::Bytes(len as usize)),
        Some(Value::Number(len)) if len >= 0. && len.is_finite() => {
            Ok(Pattern::Bytes(len as usize))
        }
        Some(Value::String(pattern)) => match pattern.to_str()? {
            "*l" | "l" => Ok(Pattern::Line),
            "*a" | "a" => Ok(Pattern::All),
            other => Err(mlua::Error::runtime(format!(
                "invalid receive pattern `{other}`"
            ))),
        },
        Some(other) => Err(mlua::Error::runtime(format!(
            "invalid receive pattern of type {}",
            other.type_name()
        ))),
    }
}

fn status<T>(result: io::Result<T>) -> (Option<T>, Option<String>) {
    match result {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err.to_string())),
    }
}

fn seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|duration| !duration.is_zero())
}
