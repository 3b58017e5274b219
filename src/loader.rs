//! Runtime shim provider.
//!
//! The compiled artifacts need Go's `wasm_exec.js` glue to run. It is served
//! to the bundler as a virtual module that instantiates the `Go` entry object
//! and default-exports it.

use crate::config::TransformerConfig;
use crate::helpers;
use crate::transform::{GeneratedModule, SideEffects};
use anyhow::{Context, Result};

/// Import specifier modules use to reach the runtime shim.
pub const WASM_EXEC_VIRTUAL_PATH: &str = "go_wasm:wasm_exec";

/// The bundler-internal id for the shim module. The `\0` prefix keeps other
/// plugins and the filesystem resolver away from it.
pub fn resolved_wasm_exec_id() -> String {
    format!("\0{WASM_EXEC_VIRTUAL_PATH}")
}

/// Load the shim file and append the entry-object instantiation.
///
/// Creating the `Go` object has observable global effects, so the module is
/// marked as not tree-shakeable. Pure function of the shim file contents:
/// calling it again yields the same text.
pub fn load_wasm_exec(config: &TransformerConfig) -> Result<GeneratedModule> {
    let shim = helpers::read_file(&config.wasm_exec_path).with_context(|| {
        format!(
            "Could not load the wasm_exec runtime shim from {}. Set the wasmExecPath option or the GOROOT environment variable to a Go toolchain that provides it",
            config.wasm_exec_path.display()
        )
    })?;

    Ok(GeneratedModule {
        code: format!("{shim}\nconst go = new Go()\nexport default go\n"),
        side_effects: SideEffects::NoTreeshake,
    })
}
