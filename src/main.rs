use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use indicatif::ProgressBar;
use log::LevelFilter;
use regex::Regex;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::{env, fs};

use gowasm::cleanup::{self, ResourceRegistry};
use gowasm::config::{self, BuilderOptions, TransformerOptions};
use gowasm::transform::FsAssetEmitter;
use gowasm::{build, cli, loader, temp_dir, transform};

fn main() {
    let cli = cli::Cli::parse();

    let log_level_filter = cli.verbose.log_level_filter();

    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "{}:\n{}", record.level(), record.args()))
        .filter_level(log_level_filter)
        .target(env_logger::fmt::Target::Stdout)
        .init();

    // Cleanup must be wired before any scratch directory can exist.
    cleanup::install_process_hooks();

    let show_progress = log_level_filter == LevelFilter::Info;

    let result = match cli.command {
        cli::Command::Build(build_args) => cmd_build(build_args, show_progress),
        cli::Command::Sweep => cmd_sweep(),
        cli::Command::Shim(shim_args) => cmd_shim(shim_args),
    };

    // Normal-exit drain; the signal and panic hooks cover the other paths.
    ResourceRegistry::global().run_all();

    if let Err(e) = result {
        println!("{e:#}");
        std::process::exit(1);
    }
}

#[derive(Serialize)]
struct ModuleReport {
    module: String,
    artifact: Option<String>,
    loader: Option<String>,
    error: Option<String>,
}

fn loader_file_path(loader_dir: &Path, module_id: &Path) -> PathBuf {
    loader_dir.join(module_id.with_extension("mjs"))
}

fn cmd_build(args: cli::BuildArgs, show_progress: bool) -> Result<()> {
    let builder_options = BuilderOptions {
        build_dir: args.build_dir,
        binary_path: args.binary_path,
        command_extra_args: (!args.extra_args.is_empty()).then_some(args.extra_args),
    };
    let transformer_options = TransformerOptions {
        output_mode: Some(args.mode),
        wasm_exec_path: args.wasm_exec_path,
    };

    let builder_config = config::resolve_builder_options(Some(&builder_options))?;
    let transformer_config = config::resolve_transformer_options(Some(&transformer_options))?;

    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid --filter regex")?;

    let progress = if show_progress {
        ProgressBar::new(args.modules.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let outcomes = build::build_many(
        &args.modules,
        &builder_config,
        &filter,
        || progress.inc(1),
        &build::LogReporter,
    );
    progress.finish_and_clear();

    fs::create_dir_all(&args.loader_dir)
        .with_context(|| format!("Could not create {}", args.loader_dir.display()))?;

    // The loader modules import the shim by its virtual specifier; write the
    // generated shim module alongside them so a host can alias it.
    let shim = loader::load_wasm_exec(&transformer_config)?;
    fs::write(args.loader_dir.join("wasm_exec.mjs"), &shim.code)
        .with_context(|| format!("Could not write the shim module under {}", args.loader_dir.display()))?;

    let emitter = FsAssetEmitter::new(args.loader_dir.join("assets"));

    let mut reports = Vec::with_capacity(outcomes.len());
    let mut failed = 0;
    for outcome in &outcomes {
        let module = outcome.module_id.display().to_string();
        match &outcome.result {
            Ok(artifact) => {
                match transform::transform(artifact, &outcome.module_id, &transformer_config, &emitter)
                    .and_then(|generated| {
                        let loader_file = loader_file_path(&args.loader_dir, &outcome.module_id);
                        if let Some(parent) = loader_file.parent() {
                            fs::create_dir_all(parent)
                                .with_context(|| format!("Could not create {}", parent.display()))?;
                        }
                        fs::write(&loader_file, &generated.code)
                            .with_context(|| format!("Could not write {}", loader_file.display()))?;
                        Ok(loader_file)
                    }) {
                    Ok(loader_file) => {
                        if !args.json {
                            println!("{} {module}", style("✓").green());
                        }
                        reports.push(ModuleReport {
                            module,
                            artifact: Some(artifact.display().to_string()),
                            loader: Some(loader_file.display().to_string()),
                            error: None,
                        });
                    }
                    Err(e) => {
                        failed += 1;
                        if !args.json {
                            println!("{} {module}: {e:#}", style("✗").red());
                        }
                        reports.push(ModuleReport {
                            module,
                            artifact: Some(artifact.display().to_string()),
                            loader: None,
                            error: Some(format!("{e:#}")),
                        });
                    }
                }
            }
            Err(e) => {
                failed += 1;
                if !args.json {
                    println!("{} {module}: {e:#}", style("✗").red());
                }
                reports.push(ModuleReport {
                    module,
                    artifact: None,
                    loader: None,
                    error: Some(format!("{e:#}")),
                });
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        let built = reports.len() - failed;
        println!(
            "{} {built} module(s) built, {failed} failed, loader code in {}",
            style("Finished:").bold(),
            args.loader_dir.display()
        );
    }

    if failed > 0 {
        bail!("{failed} of {} module(s) failed to build", reports.len());
    }
    Ok(())
}

fn cmd_sweep() -> Result<()> {
    let temp_root = env::temp_dir();
    let swept = temp_dir::sweep_stale_dirs(&temp_root);
    println!(
        "Swept {swept} stale scratch director{} under {}",
        if swept == 1 { "y" } else { "ies" },
        temp_root.display()
    );
    Ok(())
}

fn cmd_shim(args: cli::ShimArgs) -> Result<()> {
    let options = TransformerOptions {
        output_mode: None,
        wasm_exec_path: args.wasm_exec_path,
    };
    let transformer_config = config::resolve_transformer_options(Some(&options))?;
    let shim = loader::load_wasm_exec(&transformer_config)?;
    print!("{}", shim.code);
    Ok(())
}
