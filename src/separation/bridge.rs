//! Python bridge to audio-separator
//!
//! Runs an embedded driver script in a persistent child interpreter and talks
//! to it with one JSON object per line: requests on the child's stdin,
//! responses on its stdout. The child's stderr is inherited so library logs
//! land on our diagnostic channel.

use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::backend::{Handshake, SeparationBackend};
use crate::device::ProbeReport;
use crate::error::{Result, StemError};

/// Driver executed with `python -u -c`
pub const DRIVER_SCRIPT: &str = include_str!("../../python/separator_bridge.py");

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Request to the driver
#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: String,
    command: &'a str,
    #[serde(flatten)]
    params: Map<String, Value>,
}

/// Response from the driver
#[derive(Debug, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    id: Option<String>,
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_kind: Option<String>,
    #[serde(flatten)]
    data: Map<String, Value>,
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// audio-separator driven through a Python child process
pub struct PythonBridge {
    python: String,
    process: Option<BridgeProcess>,
    model: Option<String>,
}

impl PythonBridge {
    /// Create a bridge for `python`; the child starts on first request
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            process: None,
            model: None,
        }
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    /// Start the child interpreter if not already running
    fn ensure_started(&mut self) -> Result<&mut BridgeProcess> {
        if self.process.is_none() {
            debug!("Starting separator bridge with {}", self.python);
            let mut child = Command::new(&self.python)
                .args(["-u", "-c", DRIVER_SCRIPT])
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                        StemError::MissingDependency {
                            component: format!("Python interpreter '{}'", self.python),
                            detail: e.to_string(),
                        }
                    }
                    _ => StemError::Bridge {
                        reason: format!("Failed to start Python bridge: {}", e),
                    },
                })?;

            let stdin = child.stdin.take().ok_or_else(|| StemError::Bridge {
                reason: "Bridge stdin not available".to_string(),
            })?;
            let stdout = child.stdout.take().ok_or_else(|| StemError::Bridge {
                reason: "Bridge stdout not available".to_string(),
            })?;

            self.process = Some(BridgeProcess {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            });
        }

        self.process.as_mut().ok_or_else(|| StemError::Bridge {
            reason: "Bridge process not running".to_string(),
        })
    }

    /// Send one command and wait for its response
    fn request(&mut self, command: &str, params: Value) -> Result<Map<String, Value>> {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let request = BridgeRequest {
            id: Uuid::new_v4().to_string(),
            command,
            params,
        };
        let request_json = serde_json::to_string(&request)?;

        let process = self.ensure_started()?;
        writeln!(process.stdin, "{}", request_json)
            .and_then(|_| process.stdin.flush())
            .map_err(|e| StemError::Bridge {
                reason: format!("Failed to write to bridge: {}", e),
            })?;

        let response = read_response(process, &request.id)?;
        if response.ok {
            return Ok(response.data);
        }

        let reason = response
            .error
            .unwrap_or_else(|| format!("{} failed without a message", command));
        Err(self.command_error(command, response.error_kind.as_deref(), reason))
    }

    fn command_error(&self, command: &str, kind: Option<&str>, reason: String) -> StemError {
        if kind == Some("missing_dependency") {
            return StemError::MissingDependency {
                component: "audio-separator".to_string(),
                detail: reason,
            };
        }
        match command {
            "load" => StemError::ModelLoad {
                model: self.model.clone().unwrap_or_default(),
                reason,
            },
            "separate" => StemError::Separation { reason },
            _ => StemError::Bridge {
                reason: format!("{}: {}", command, reason),
            },
        }
    }

    fn shutdown(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };

        let _ = writeln!(process.stdin, r#"{{"command":"shutdown"}}"#);
        let _ = process.stdin.flush();
        drop(process.stdin);

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match process.child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Separator bridge exited: {}", status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
                _ => break,
            }
        }

        warn!("Separator bridge did not exit, killing it");
        let _ = process.child.kill();
        let _ = process.child.wait();
    }
}

/// Read lines until a JSON response arrives
///
/// Anything that is not a JSON object is stray output and is logged.
fn read_response(process: &mut BridgeProcess, expected_id: &str) -> Result<BridgeResponse> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = process
            .stdout
            .read_line(&mut line)
            .map_err(|e| StemError::Bridge {
                reason: format!("Failed to read from bridge: {}", e),
            })?;

        if read == 0 {
            let status = process
                .child
                .try_wait()
                .ok()
                .flatten()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "still running".to_string());
            return Err(StemError::Bridge {
                reason: format!("Bridge closed its output ({})", status),
            });
        }

        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            if !trimmed.is_empty() {
                debug!("bridge: {}", trimmed);
            }
            continue;
        }

        let response: BridgeResponse =
            serde_json::from_str(trimmed).map_err(|e| StemError::Bridge {
                reason: format!("Invalid bridge response: {}", e),
            })?;

        match response.id.as_deref() {
            Some(id) if id != expected_id => {
                return Err(StemError::Bridge {
                    reason: format!("Response id {} does not match request {}", id, expected_id),
                });
            }
            _ => return Ok(response),
        }
    }
}

impl SeparationBackend for PythonBridge {
    fn name(&self) -> &'static str {
        "audio-separator"
    }

    fn handshake(&mut self) -> Result<Handshake> {
        let data = self.request("hello", json!({}))?;
        let handshake: Handshake = serde_json::from_value(Value::Object(data))?;
        info!(
            "audio-separator {} (PyTorch {}, Python {})",
            handshake.separator_version.as_deref().unwrap_or("unknown"),
            handshake.torch_version.as_deref().unwrap_or("unknown"),
            handshake.python_version.as_deref().unwrap_or("unknown"),
        );
        Ok(handshake)
    }

    fn probe_devices(&mut self) -> Result<ProbeReport> {
        let data = self.request("devices", json!({}))?;
        Ok(serde_json::from_value(Value::Object(data))?)
    }

    fn prepare(&mut self, device: &str, output_dir: &Path) -> Result<()> {
        self.request(
            "prepare",
            json!({
                "device": device,
                "output_dir": output_dir.to_string_lossy(),
            }),
        )?;
        Ok(())
    }

    fn load_model(&mut self, model_file: &str) -> Result<()> {
        self.model = Some(model_file.to_string());
        self.request("load", json!({ "model": model_file }))?;
        Ok(())
    }

    fn separate(&mut self, input: &Path) -> Result<Vec<PathBuf>> {
        let data = self.request("separate", json!({ "input": input.to_string_lossy() }))?;
        let outputs = data
            .get("outputs")
            .and_then(Value::as_array)
            .ok_or_else(|| StemError::Bridge {
                reason: "separate response has no outputs".to_string(),
            })?;

        Ok(outputs
            .iter()
            .filter_map(Value::as_str)
            .map(PathBuf::from)
            .collect())
    }

    fn audio_duration(&mut self, input: &Path) -> Option<f64> {
        match self.request("info", json!({ "input": input.to_string_lossy() })) {
            Ok(data) => data.get("duration").and_then(Value::as_f64),
            Err(e) => {
                debug!("Duration lookup failed: {}", e);
                None
            }
        }
    }
}

impl Drop for PythonBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
