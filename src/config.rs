//! Option resolution for the builder and the transformer.
//!
//! Explicit options win; otherwise defaults are derived from the `GOROOT`
//! environment variable. Resolution happens once per build session, holds no
//! shared mutable state, and reports failures through [`ConfigError`] so
//! callers can match on the kind and walk the cause chain.

use crate::temp_dir;
use crate::transform::OutputMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use thiserror::Error;

/// Environment variable naming the Go toolchain root. Used to derive the
/// default compiler binary and runtime shim paths, and inherited by the
/// compiler subprocess.
pub const TOOLCHAIN_ROOT_VAR: &str = "GOROOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Cannot determine the compiler binary. Set the binaryPath option or the {TOOLCHAIN_ROOT_VAR} environment variable"
    )]
    UnsetBinaryPath,

    #[error(
        "Cannot determine the wasm_exec path. Set the wasmExecPath option or the {TOOLCHAIN_ROOT_VAR} environment variable"
    )]
    UnsetWasmExecPath,

    #[error("Could not read the compiler binary at {path}")]
    BinaryReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not create the build directory {path}")]
    BuildDirCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not create a scratch build directory")]
    ScratchDirFailed {
        #[source]
        source: io::Error,
    },

    #[error("Invalid output mode: {0:?} (expected \"asset\" or \"inline\")")]
    InvalidOutputMode(String),
}

/// Host-facing builder options, all optional. Field names match the
/// camelCase configuration surface of the plugin host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderOptions {
    pub build_dir: Option<PathBuf>,
    pub binary_path: Option<PathBuf>,
    pub command_extra_args: Option<Vec<String>>,
}

/// Host-facing transformer options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerOptions {
    pub output_mode: Option<String>,
    pub wasm_exec_path: Option<PathBuf>,
}

/// Fully resolved builder configuration, immutable for the session.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub build_dir: PathBuf,
    pub binary_path: PathBuf,
    pub extra_args: Vec<String>,
}

/// Fully resolved transformer configuration, immutable for the session.
#[derive(Debug, Clone)]
pub struct TransformerConfig {
    pub output_mode: OutputMode,
    pub wasm_exec_path: PathBuf,
}

fn toolchain_root() -> Option<PathBuf> {
    env::var_os(TOOLCHAIN_ROOT_VAR).map(PathBuf::from)
}

fn default_binary_path() -> Result<PathBuf, ConfigError> {
    let root = toolchain_root().ok_or(ConfigError::UnsetBinaryPath)?;
    let mut path = root.join("bin").join("go");
    if cfg!(windows) {
        path.set_extension("exe");
    }
    Ok(path)
}

fn probe_binary(path: &Path) -> Result<(), ConfigError> {
    match fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(source) => Err(ConfigError::BinaryReadFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolve the builder configuration from explicit options and the
/// environment.
///
/// The compiler binary is taken verbatim from the options when present,
/// otherwise derived as `$GOROOT/bin/go` (with the platform executable suffix
/// on Windows). Whichever path wins is probed for readability. The build
/// directory is created when given explicitly, or a scratch directory is
/// created (and registered for exit cleanup) when omitted.
pub fn resolve_builder_options(options: Option<&BuilderOptions>) -> Result<BuilderConfig, ConfigError> {
    let binary_path = match options.and_then(|o| o.binary_path.clone()) {
        Some(path) => path,
        None => default_binary_path()?,
    };
    probe_binary(&binary_path)?;

    let build_dir = match options.and_then(|o| o.build_dir.clone()) {
        Some(dir) => {
            fs::create_dir_all(&dir).map_err(|source| ConfigError::BuildDirCreateFailed {
                path: dir.clone(),
                source,
            })?;
            dir
        }
        None => temp_dir::create_scratch_dir().map_err(|source| ConfigError::ScratchDirFailed { source })?,
    };

    let extra_args = options
        .and_then(|o| o.command_extra_args.clone())
        .unwrap_or_default();

    Ok(BuilderConfig {
        build_dir,
        binary_path,
        extra_args,
    })
}

/// Resolve the transformer configuration. The runtime shim path defaults to
/// `$GOROOT/misc/wasm/wasm_exec.js`; the output mode defaults to `asset`.
/// An unrecognized output mode is a hard failure, never a silent default.
pub fn resolve_transformer_options(
    options: Option<&TransformerOptions>,
) -> Result<TransformerConfig, ConfigError> {
    let wasm_exec_path = match options.and_then(|o| o.wasm_exec_path.clone()) {
        Some(path) => path,
        None => {
            let root = toolchain_root().ok_or(ConfigError::UnsetWasmExecPath)?;
            root.join("misc").join("wasm").join("wasm_exec.js")
        }
    };

    let output_mode = match options.and_then(|o| o.output_mode.as_deref()) {
        Some(mode) => mode.parse::<OutputMode>()?,
        None => OutputMode::default(),
    };

    Ok(TransformerConfig {
        output_mode,
        wasm_exec_path,
    })
}
