//! TCP listener lookup through `lsof`.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::core::backend_monitor::PortResolver;

pub const DEFAULT_PORT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_STEP: Duration = Duration::from_millis(20);

/// Runs `lsof -nP -iTCP:<port> -sTCP:LISTEN -t` with a hard timeout.
///
/// A missing binary, a failing exit status, empty output or a timeout all
/// mean "no listener".
#[derive(Debug, Clone)]
pub struct LsofPortResolver {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl LsofPortResolver {
    pub fn new(timeout: Duration) -> Self {
        let program = which::which("lsof").ok();
        if program.is_none() {
            log::warn!("lsof not found in PATH, port lookups are disabled");
        }
        Self { program, timeout }
    }

    /// Use a specific executable instead of searching PATH
    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: Some(program.into()),
            timeout,
        }
    }

    fn run(&self, program: &PathBuf, port: u16) -> Option<String> {
        let mut child = Command::new(program)
            .args(["-nP", &format!("-iTCP:{}", port), "-sTCP:LISTEN", "-t"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| log::warn!("Failed to spawn {:?}: {}", program, e))
            .ok()?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    log::warn!("Port lookup for {} timed out after {:?}", port, self.timeout);
                    if let Err(e) = child.kill() {
                        log::error!("Failed to kill port lookup: {}", e);
                    }
                    let _ = child.wait();
                    return None;
                }
                Ok(None) => std::thread::sleep(POLL_STEP),
                Err(e) => {
                    log::warn!("Port lookup wait failed: {}", e);
                    return None;
                }
            }
        };

        // lsof exits 1 when nothing matches
        if !status.success() {
            return None;
        }

        let mut output = String::new();
        child.stdout.take()?.read_to_string(&mut output).ok()?;
        Some(output)
    }
}

impl Default for LsofPortResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PORT_LOOKUP_TIMEOUT)
    }
}

impl PortResolver for LsofPortResolver {
    fn listening_pid(&self, port: u16) -> Option<u32> {
        let program = self.program.as_ref()?;
        let output = self.run(program, port)?;
        let pid = parse_first_pid(&output);
        log::debug!("Port {} listener: {:?}", port, pid);
        pid
    }
}

/// First line of `lsof -t` output that is a pid
pub fn parse_first_pid(output: &str) -> Option<u32> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse().ok())
}
