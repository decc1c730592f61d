//! Classification tables for known inference backends.
//!
//! Both tables are evaluated top to bottom and the first matching row wins.
//! Adding a backend is a new row, not new branching logic.
//!
//! Row order in [`PATH_PATTERNS`] matters: desktop apps that embed a copy of a
//! well-known server binary are listed before the standalone server, so the
//! bundled copy is attributed to the app.

use super::types::{executable_name, BackendType};

/// A predicate over an executable path.
#[derive(Debug, Clone, Copy)]
pub enum PathMatcher {
    /// Case-insensitive substring anywhere in the path
    Contains(&'static str),
    /// Exact executable base name
    FileName(&'static str),
}

impl PathMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Contains(needle) => path.to_lowercase().contains(&needle.to_lowercase()),
            PathMatcher::FileName(name) => executable_name(path) == *name,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PathPattern {
    pub matchers: &'static [PathMatcher],
    pub backend: BackendType,
    pub name: &'static str,
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }
}

/// Substring rules applied to the joined argument vector of interpreted runtimes.
#[derive(Debug, Clone, Copy)]
pub struct ArgvPattern {
    pub needles: &'static [&'static str],
    pub backend: BackendType,
    pub name: &'static str,
}

impl ArgvPattern {
    pub fn matches(&self, argv: &str) -> bool {
        self.needles.iter().any(|n| argv.contains(n))
    }
}

pub const PATH_PATTERNS: &[PathPattern] = &[
    PathPattern {
        matchers: &[
            PathMatcher::Contains("LM Studio.app/"),
            PathMatcher::Contains("lm-studio"),
            PathMatcher::Contains("lmstudio"),
        ],
        backend: BackendType::LmStudio,
        name: "LM Studio",
    },
    PathPattern {
        matchers: &[
            PathMatcher::Contains("Ollama.app/"),
            PathMatcher::FileName("ollama"),
            PathMatcher::FileName("ollama_llama_server"),
        ],
        backend: BackendType::Ollama,
        name: "Ollama",
    },
    PathPattern {
        matchers: &[
            PathMatcher::FileName("local-ai"),
            PathMatcher::FileName("localai"),
        ],
        backend: BackendType::LocalAi,
        name: "LocalAI",
    },
    PathPattern {
        matchers: &[
            PathMatcher::FileName("llama-server"),
            PathMatcher::FileName("llama-cpp-server"),
            PathMatcher::Contains("llama.cpp/build/bin/server"),
        ],
        backend: BackendType::LlamaServer,
        name: "llama.cpp",
    },
];

pub const ARGV_PATTERNS: &[ArgvPattern] = &[
    ArgvPattern {
        needles: &["mlx_lm.server", "mlx_lm server"],
        backend: BackendType::MlxLm,
        name: "MLX-LM",
    },
    ArgvPattern {
        needles: &["vllm.entrypoints", "vllm serve", "bin/vllm"],
        backend: BackendType::Vllm,
        name: "vLLM",
    },
    ArgvPattern {
        needles: &["llama_cpp.server"],
        backend: BackendType::LlamaServer,
        name: "llama.cpp (Python)",
    },
    ArgvPattern {
        needles: &["localai"],
        backend: BackendType::LocalAi,
        name: "LocalAI",
    },
];

/// First path row accepting `path`
pub fn match_path(path: &str) -> Option<&'static PathPattern> {
    if path.is_empty() {
        return None;
    }
    PATH_PATTERNS.iter().find(|p| p.matches(path))
}

/// First argv row accepting the joined argument vector
pub fn match_argv(args: &[String]) -> Option<&'static ArgvPattern> {
    let joined = args.join(" ");
    ARGV_PATTERNS.iter().find(|p| p.matches(&joined))
}

/// Executables whose real identity lives in their argument vector
pub fn is_interpreted_runtime(path: &str) -> bool {
    let name = executable_name(path);
    name.starts_with("python") || name.starts_with("Python")
}

const BUNDLE_MARKER: &str = ".app/";
const FRAMEWORK_MARKER: &str = ".framework/";
const APPIMAGE_MARKER: &str = "/.mount_";

/// Path prefix of the application bundle containing `path`, including the
/// trailing separator.
///
/// Executables nested inside a framework (e.g. a language runtime's wrapper
/// app) are not treated as bundle members.
pub fn bundle_prefix(path: &str) -> Option<&str> {
    if let Some(pos) = path.find(BUNDLE_MARKER) {
        let end = pos + BUNDLE_MARKER.len();
        if path[..pos].contains(FRAMEWORK_MARKER) {
            return None;
        }
        return Some(&path[..end]);
    }

    // AppImage: /tmp/.mount_<id>/...
    let pos = path.find(APPIMAGE_MARKER)?;
    let rest = &path[pos + 1..];
    let end = pos + 1 + rest.find('/')? + 1;
    Some(&path[..end])
}
