use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of the process table, frozen for the duration of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub executable_path: String,
    pub parent_pid: Option<u32>,
}

impl ProcessRecord {
    /// Base name of the executable, or the whole path when it has no separator
    pub fn executable_name(&self) -> &str {
        executable_name(&self.executable_path)
    }
}

/// Base name of an executable path
pub fn executable_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Inference backends the detector knows how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendType {
    Ollama,
    LmStudio,
    MlxLm,
    Vllm,
    LocalAi,
    LlamaServer,
    Custom,
    Unknown,
}

impl BackendType {
    /// Fixed resolution order used when no type is preferred
    pub const PRIORITY: [BackendType; 8] = [
        BackendType::Ollama,
        BackendType::LmStudio,
        BackendType::MlxLm,
        BackendType::Vllm,
        BackendType::LocalAi,
        BackendType::LlamaServer,
        BackendType::Custom,
        BackendType::Unknown,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BackendType::Ollama => "Ollama",
            BackendType::LmStudio => "LM Studio",
            BackendType::MlxLm => "MLX-LM",
            BackendType::Vllm => "vLLM",
            BackendType::LocalAi => "LocalAI",
            BackendType::LlamaServer => "llama.cpp",
            BackendType::Custom => "Custom",
            BackendType::Unknown => "Unknown",
        }
    }

    /// Position in [`BackendType::PRIORITY`]; lower wins.
    pub fn priority(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|t| t == self)
            .unwrap_or(Self::PRIORITY.len())
    }
}

impl FromStr for BackendType {
    type Err = String;

    /// Accepts the serialized name or the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::PRIORITY
            .iter()
            .copied()
            .find(|t| {
                t.display_name().to_lowercase() == wanted
                    || serde_json::to_value(t)
                        .ok()
                        .and_then(|v| v.as_str().map(|name| name.to_lowercase() == wanted))
                        .unwrap_or(false)
            })
            .ok_or_else(|| format!("Unknown backend type: {}", s))
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Resource reading for one identified backend process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSnapshot {
    pub pid: u32,
    pub backend_type: BackendType,
    pub name: String,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
}

/// A process offered to the user for manual selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProcess {
    pub record: ProcessRecord,
    pub name: String,
    pub memory_bytes: u64,
}
