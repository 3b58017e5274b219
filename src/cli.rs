use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version)]
#[command(name = "gowasm")]
#[command(about = "Compile Go modules to WebAssembly and emit bundler loader code")]
pub struct Cli {
    /// Verbosity:
    /// -v -> Debug
    /// -vv -> Trace
    /// -q -> Warn
    /// -qq -> Error
    /// -qqq -> Off
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Go source modules to compile
    #[arg(required = true)]
    pub modules: Vec<PathBuf>,

    /// Directory for compiled artifacts. A scratch directory under the
    /// platform temp root is created (and removed on exit) when omitted
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Path to the go binary. Defaults to $GOROOT/bin/go
    #[arg(long)]
    pub binary_path: Option<PathBuf>,

    /// Extra argument passed through to `go build` (repeatable)
    #[arg(long = "extra-arg", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// How artifacts reach the browser: emitted asset or inline data URI
    #[arg(long, default_value = "asset")]
    pub mode: String,

    /// Path to wasm_exec.js. Defaults to $GOROOT/misc/wasm/wasm_exec.js
    #[arg(long)]
    pub wasm_exec_path: Option<PathBuf>,

    /// Only build modules whose path matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Where generated loader modules and emitted assets are written
    #[arg(long, default_value = "gowasm-out")]
    pub loader_dir: PathBuf,

    /// Print the build summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShimArgs {
    /// Path to wasm_exec.js. Defaults to $GOROOT/misc/wasm/wasm_exec.js
    #[arg(long)]
    pub wasm_exec_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile Go source modules and emit loader code for each
    Build(BuildArgs),

    /// Remove stale scratch directories left behind by crashed runs
    Sweep,

    /// Print the generated runtime shim module
    Shim(ShimArgs),
}
