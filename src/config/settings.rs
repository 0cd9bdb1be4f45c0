//! Tunables for the engine, the bus watch and diagnostics
//!
//! # Main Types
//!
//! - [`EngineConfig`] - Streaming-thread timing and naming
//! - [`BusConfig`] - Watch installation policy and pump cadence
//! - [`DiagnosticsConfig`] - What reaches the diagnostic sink
//! - [`LoggingConfig`] - Subscriber filter and optional log file (binary only)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default percent steps posted by buffering nodes while prerolling
pub const DEFAULT_BUFFERING_STEPS: &[u8] = &[0, 50, 100];

/// Engine timing and thread naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Artificial latency per state step, in milliseconds
    pub state_change_delay_ms: u64,

    /// Latency before a dynamic connector appears, in milliseconds
    pub dynamic_pad_delay_ms: u64,

    /// Percent values posted as Buffering messages during preroll
    pub buffering_steps: Vec<u8>,

    /// Prefix for streaming thread names (followed by the pipeline name)
    pub streaming_thread_name_prefix: String,
}

impl EngineConfig {
    pub fn state_change_delay(&self) -> Duration {
        Duration::from_millis(self.state_change_delay_ms)
    }

    pub fn dynamic_pad_delay(&self) -> Duration {
        Duration::from_millis(self.dynamic_pad_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_change_delay_ms: 0,
            dynamic_pad_delay_ms: 0,
            buffering_steps: DEFAULT_BUFFERING_STEPS.to_vec(),
            streaming_thread_name_prefix: "stream:".to_string(),
        }
    }
}

/// What happens when a bus watch is installed on an already-watched pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RewatchPolicy {
    /// Tear down the previous watch, then install the new one
    #[default]
    Replace,
    /// Refuse with `BridgeError::WatchAlreadyInstalled`
    Reject,
}

impl std::fmt::Display for RewatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewatchPolicy::Replace => write!(f, "replace"),
            RewatchPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Bus watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub rewatch_policy: RewatchPolicy,

    /// Prefix for bus pump thread names (followed by the pipeline ID)
    pub pump_thread_name_prefix: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            rewatch_policy: RewatchPolicy::Replace,
            pump_thread_name_prefix: "bus:".to_string(),
        }
    }
}

/// Diagnostic sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Surface Error descriptions through the diagnostic sink before forwarding
    pub forward_errors: bool,

    /// Append the engine's debug detail to the diagnostic text
    pub include_debug_info: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            forward_errors: true,
            include_debug_info: true,
        }
    }
}

/// Logging setup used by the demo binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Also write plain-text logs here
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,mediabridge_rs=debug".to_string(),
            log_file: None,
        }
    }
}
