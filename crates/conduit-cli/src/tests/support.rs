//! Test support utilities for CLI behavioural coverage.
//!
//! Supplies a fake bridge that answers one connection with a canned body and
//! a world type capturing CLI output.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use conduit_config::Config;
use serde_json::Value;

use crate::config::ConfigLoader;
use crate::errors::AppError;
use crate::run_with_loader;

pub(super) const PONG: &str = r#"{"success":true,"status":"success","result":{"message":"pong"}}"#;

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// How the fake bridge answers its single connection.
#[derive(Debug, Clone)]
pub(super) enum Reply {
    /// Honour the requested framing and send this body.
    Body(String),
    /// Close the connection without writing anything.
    Close,
}

/// Bridge stand-in serving exactly one connection.
pub(super) struct FakeBridge {
    port: u16,
    request: Arc<Mutex<Option<Value>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeBridge {
    pub fn spawn(reply: Reply) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake bridge")?;
        let port = listener.local_addr().context("local addr")?.port();
        let request = Arc::new(Mutex::new(None));
        let recorded = Arc::clone(&request);
        let handle = thread::spawn(move || {
            if let Err(error) = Self::serve(&listener, &reply, &recorded) {
                eprintln!("fake bridge failed: {error:#}");
            }
        });
        Ok(Self {
            port,
            request,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn serve(listener: &TcpListener, reply: &Reply, recorded: &Mutex<Option<Value>>) -> Result<()> {
        let (mut stream, _) = listener.accept().context("accept")?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;

        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 1024];
        let request = loop {
            let read = stream.read(&mut chunk).context("read request")?;
            ensure!(read > 0, "client closed before sending a request");
            buffer.extend_from_slice(&chunk[..read]);
            if let Ok(value) = serde_json::from_slice::<Value>(&buffer) {
                break value;
            }
        };
        let framed = request["_mcp"]["response_framing"] == "len32le";
        *recorded
            .lock()
            .map_err(|_| anyhow!("request mutex poisoned"))? = Some(request);

        if let Reply::Body(body) = reply {
            if framed {
                let length = u32::try_from(body.len()).context("body length")?;
                stream.write_all(&length.to_le_bytes())?;
            }
            stream.write_all(body.as_bytes())?;
        }
        Ok(())
    }

    /// Waits for the connection to finish and returns the request received.
    pub fn take_request(&mut self) -> Result<Value> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake bridge thread panicked"))?;
        }
        self.request
            .lock()
            .map_err(|_| anyhow!("request mutex poisoned"))?
            .take()
            .context("fake bridge received no request")
    }
}

#[derive(Default)]
pub(super) struct TestWorld {
    pub config: Config,
    pub bridge: Option<FakeBridge>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub request: Option<Value>,
}

impl TestWorld {
    pub fn start_bridge(&mut self, reply: Reply) -> Result<()> {
        let bridge = FakeBridge::spawn(reply)?;
        self.config.host = "127.0.0.1".to_string();
        self.config.port = bridge.port();
        self.bridge = Some(bridge);
        Ok(())
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.request = None;
        let loader = StaticConfigLoader::new(self.config.clone());
        let exit = run_with_loader(
            Self::build_args(command),
            &mut self.stdout,
            &mut self.stderr,
            &loader,
        );
        self.exit_code = Some(exit);
        if let Some(mut bridge) = self.bridge.take() {
            self.request = bridge.take_request().ok();
        }
        Ok(())
    }

    /// Splits on whitespace; single-quoted segments stay whole.
    fn build_args(command: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from("conduit")];
        for (index, segment) in command.split('\'').enumerate() {
            if index % 2 == 1 {
                args.push(OsString::from(segment));
            } else {
                args.extend(segment.split_whitespace().map(OsString::from));
            }
        }
        args
    }

    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout utf8")
    }

    pub fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr utf8")
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {exit:?}"
        );
        Ok(())
    }

    pub fn request(&self) -> Result<&Value> {
        self.request.as_ref().context("bridge recorded a request")
    }
}
