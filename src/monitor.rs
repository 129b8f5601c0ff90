use crate::data::DeviceMetric;
use crate::error::MonitorError;
use crate::normalize::{parse_output, QUERY_FIELDS};
use log::{debug, info, log, warn, Level};
use std::future::Future;
use std::io::{self, ErrorKind};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::process::Command;

/// Hard bound on a single provider invocation.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

pub const SMI_PROGRAM: &str = "nvidia-smi";

pub trait GpuSource: Send {
    /// Never fails: an unavailable, failing or slow provider yields no devices.
    fn fetch_gpu_metrics(&self) -> impl Future<Output = Vec<DeviceMetric>> + Send;
}

/// Queries `nvidia-smi` (or any command printing the same CSV layout).
#[derive(Debug)]
pub struct SmiSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    // set while the provider keeps failing, so only the first failure warns
    failing: AtomicBool,
}

impl SmiSource {
    pub fn new() -> Self {
        Self {
            program: SMI_PROGRAM.to_string(),
            args: vec![
                format!("--query-gpu={}", QUERY_FIELDS.join(",")),
                "--format=csv,noheader,nounits".to_string(),
            ],
            timeout: PROVIDER_TIMEOUT,
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: PROVIDER_TIMEOUT,
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Relaxed)
    }

    /// Level for a failed query: `Warn` the first time, `Debug` while the
    /// failure persists.
    fn failure_level(&self) -> Level {
        if self.failing.swap(true, Ordering::Relaxed) {
            Level::Debug
        } else {
            Level::Warn
        }
    }

    /// Runs the provider and returns its stdout. Invalid UTF-8 is dropped.
    pub async fn query(&self) -> Result<String, MonitorError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => MonitorError::ProviderUnavailable(self.program.clone()),
                _ => MonitorError::Io(e),
            })?;

        // dropping the wait future on timeout kills the child
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MonitorError::ProviderTimeout(self.timeout))??;

        if !output.status.success() {
            return Err(MonitorError::ProviderFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace(char::REPLACEMENT_CHARACTER, ""))
    }
}

impl Default for SmiSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuSource for SmiSource {
    async fn fetch_gpu_metrics(&self) -> Vec<DeviceMetric> {
        match self.query().await {
            Ok(text) => {
                if self.failing.swap(false, Ordering::Relaxed) {
                    info!("{} is answering again", self.program);
                }
                let gpus = parse_output(&text);
                debug!("{} reported {} device(s)", self.program, gpus.len());
                gpus
            }
            Err(MonitorError::ProviderUnavailable(program)) => {
                debug!("{program} not found, reporting no GPUs");
                Vec::new()
            }
            Err(e) => {
                log!(self.failure_level(), "GPU query failed: {e}");
                Vec::new()
            }
        }
    }
}

/// Human readable one-line summary of a provider probe.
pub fn backend_summary(source: &SmiSource, gpus: &[DeviceMetric]) -> String {
    if gpus.is_empty() {
        format!(
            "GPU backend: {0} returned no GPUs or {0} not found.",
            source.program()
        )
    } else {
        format!(
            "GPU backend: {}. GPUs detected: {}",
            source.program(),
            gpus.len()
        )
    }
}

/// Queries `source` once on its own thread and prints the summary line, so a
/// slow provider never holds up the caller.
pub fn spawn_backend_summary(source: SmiSource) -> io::Result<JoinHandle<String>> {
    thread::Builder::new()
        .name("gpu-summary".to_string())
        .spawn(move || {
            let gpus = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(source.fetch_gpu_metrics()),
                Err(e) => {
                    warn!("skipping GPU summary: {e}");
                    Vec::new()
                }
            };
            let line = backend_summary(&source, &gpus);
            println!("{line}");
            line
        })
}
