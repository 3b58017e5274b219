//! External compiler invocation.
//!
//! One `go build` subprocess per module, cross-compiling to `GOOS=js
//! GOARCH=wasm` with a curated environment. Success is decided by the exit
//! code alone; captured output streams are forwarded to a reporter and never
//! interpreted.

use crate::config::{BuilderConfig, TOOLCHAIN_ROOT_VAR};
use crate::helpers;
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::{env, fs, io};
use thiserror::Error;

/// Extension of recognized source modules.
pub const SOURCE_EXTENSION: &str = "go";
/// Extension of compiled artifacts.
pub const ARTIFACT_EXTENSION: &str = "wasm";

const COMPILER_SUBCOMMAND: &str = "build";
const OUTPUT_FLAG: &str = "-o";

/// Per-module build failure. Spawn failures and compiler failures are
/// distinct kinds; both are fatal for the module only.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Could not start the compiler process")]
    Spawn {
        #[source]
        source: io::Error,
    },

    #[error("Could not create the artifact directory {path}")]
    ArtifactDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("builder exit with code: {}", exit_code_label(.code))]
    ExitCode { code: Option<i32> },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Receives the compiler's captured output streams, forwarded once per
/// invocation after the child exits. Informational only: the reporter never
/// influences build success.
pub trait CompilerReporter: Send + Sync {
    fn stdout(&self, module_id: &Path, text: &str);
    fn stderr(&self, module_id: &Path, text: &str);
}

/// Forwards compiler output to the process logger.
pub struct LogReporter;

impl CompilerReporter for LogReporter {
    fn stdout(&self, module_id: &Path, text: &str) {
        log::info!("{}:\n{text}", module_id.display());
    }

    fn stderr(&self, module_id: &Path, text: &str) {
        log::error!("{}:\n{text}", module_id.display());
    }
}

/// Discards all compiler output.
pub struct NoopReporter;

impl CompilerReporter for NoopReporter {
    fn stdout(&self, _module_id: &Path, _text: &str) {}
    fn stderr(&self, _module_id: &Path, _text: &str) {}
}

/// Derive the artifact path for a module: the module id relativized against
/// the working directory, relocated under the build directory, with the
/// source extension replaced by the artifact extension.
pub fn artifact_path(module_id: &Path, build_dir: &Path) -> PathBuf {
    let relative = helpers::relative_to_cwd(module_id);
    build_dir.join(relative.with_extension(ARTIFACT_EXTENSION))
}

/// Compile one module to a WebAssembly artifact.
///
/// Exactly one subprocess is spawned; no retry, no timeout. The child runs in
/// the caller's working directory with an environment reduced to the
/// toolchain root variables, a build-local cache, and the wasm cross-compile
/// target.
pub fn build<R: CompilerReporter>(
    module_id: &Path,
    config: &BuilderConfig,
    reporter: &R,
) -> Result<PathBuf, BuildError> {
    let artifact = artifact_path(module_id, &config.build_dir);

    if let Some(parent) = artifact.parent() {
        fs::create_dir_all(parent).map_err(|source| BuildError::ArtifactDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut cmd = Command::new(&config.binary_path);
    cmd.arg(COMPILER_SUBCOMMAND)
        .args(&config.extra_args)
        .arg(OUTPUT_FLAG)
        .arg(&artifact)
        .arg(module_id)
        .env_clear()
        .env("GOCACHE", config.build_dir.join(".gocache"))
        .env("GOOS", "js")
        .env("GOARCH", "wasm");
    for var in [TOOLCHAIN_ROOT_VAR, "GOPATH"] {
        if let Some(value) = env::var_os(var) {
            cmd.env(var, value);
        }
    }

    let output = cmd.output().map_err(|source| BuildError::Spawn { source })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if helpers::contains_ascii_characters(&stdout) {
        reporter.stdout(module_id, stdout.trim_end());
    }
    if helpers::contains_ascii_characters(&stderr) {
        reporter.stderr(module_id, stderr.trim_end());
    }

    if output.status.success() {
        Ok(artifact)
    } else {
        Err(BuildError::ExitCode {
            code: output.status.code(),
        })
    }
}

/// Outcome of one module's build within a fan-out.
pub struct ModuleOutcome {
    pub module_id: PathBuf,
    pub result: Result<PathBuf, BuildError>,
}

/// Build many modules in parallel. Modules not matching `filter` are skipped
/// entirely. Failures are collected per module and never short-circuit
/// sibling builds; `inc` is called once per attempted module.
pub fn build_many<R: CompilerReporter>(
    module_ids: &[PathBuf],
    config: &BuilderConfig,
    filter: &Option<Regex>,
    inc: impl Fn() + Sync,
    reporter: &R,
) -> Vec<ModuleOutcome> {
    module_ids
        .par_iter()
        .filter(|module_id| {
            filter
                .as_ref()
                .is_none_or(|re| re.is_match(&module_id.to_string_lossy()))
        })
        .map(|module_id| {
            let result = build(module_id, config, reporter);
            inc();
            ModuleOutcome {
                module_id: module_id.clone(),
                result,
            }
        })
        .collect()
}
