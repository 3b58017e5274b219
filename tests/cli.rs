//! End-to-end tests driving the compiled binary with a fake Go toolchain.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_gowasm")
}

/// A fake toolchain: a compiler script that writes a placeholder artifact to
/// its `-o` target and exits with the given code, plus a wasm_exec.js shim.
fn fake_toolchain(dir: &Path, exit_code: i32) -> (PathBuf, PathBuf) {
    let compiler = dir.join("fake-go");
    let script = format!(
        "#!/bin/sh\n\
         out=\"\"\n\
         while [ $# -gt 0 ]; do\n\
         \tif [ \"$1\" = \"-o\" ]; then out=\"$2\"; shift; fi\n\
         \tshift\n\
         done\n\
         [ -n \"$out\" ] && printf 'asm' > \"$out\"\n\
         exit {exit_code}\n"
    );
    fs::write(&compiler, script).unwrap();
    fs::set_permissions(&compiler, fs::Permissions::from_mode(0o755)).unwrap();

    let shim = dir.join("wasm_exec.js");
    fs::write(&shim, "globalThis.Go = class Go {}\n").unwrap();

    (compiler, shim)
}

fn scratch_children(temp_root: &Path) -> Vec<String> {
    fs::read_dir(temp_root)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| name.starts_with("go-wasm-"))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn build_emits_an_inline_loader_module() {
    let dir = tempfile::tempdir().unwrap();
    let (compiler, shim) = fake_toolchain(dir.path(), 0);
    fs::write(dir.path().join("main.go"), "package main\nfunc main() {}\n").unwrap();

    let output = Command::new(bin())
        .current_dir(dir.path())
        .arg("build")
        .arg("main.go")
        .arg("--build-dir")
        .arg("out")
        .arg("--binary-path")
        .arg(&compiler)
        .arg("--wasm-exec-path")
        .arg(&shim)
        .arg("--mode")
        .arg("inline")
        .arg("--loader-dir")
        .arg("loaders")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(dir.path().join("out/main.wasm").is_file());
    let code = fs::read_to_string(dir.path().join("loaders/main.mjs")).unwrap();
    assert!(code.contains("data:application/wasm;base64,"));
    assert!(code.contains("import Go from 'go_wasm:wasm_exec'"));
    assert!(dir.path().join("loaders/wasm_exec.mjs").is_file());
    // inline mode emits no assets
    assert!(!dir.path().join("loaders/assets").exists());
}

#[test]
fn build_in_asset_mode_emits_the_artifact_as_an_asset() {
    let dir = tempfile::tempdir().unwrap();
    let (compiler, shim) = fake_toolchain(dir.path(), 0);
    fs::write(dir.path().join("main.go"), "package main\nfunc main() {}\n").unwrap();

    let output = Command::new(bin())
        .current_dir(dir.path())
        .arg("build")
        .arg("main.go")
        .arg("--build-dir")
        .arg("out")
        .arg("--binary-path")
        .arg(&compiler)
        .arg("--wasm-exec-path")
        .arg(&shim)
        .arg("--loader-dir")
        .arg("loaders")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    assert!(dir.path().join("loaders/assets/main.wasm").is_file());
    let code = fs::read_to_string(dir.path().join("loaders/main.mjs")).unwrap();
    assert!(code.contains("import.meta.ROLLUP_FILE_URL_"));
}

#[test]
fn invalid_output_mode_fails_without_building() {
    let dir = tempfile::tempdir().unwrap();
    let (compiler, shim) = fake_toolchain(dir.path(), 0);

    let output = Command::new(bin())
        .current_dir(dir.path())
        .arg("build")
        .arg("main.go")
        .arg("--build-dir")
        .arg("out")
        .arg("--binary-path")
        .arg(&compiler)
        .arg("--wasm-exec-path")
        .arg(&shim)
        .arg("--mode")
        .arg("banana")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Invalid output mode"), "stdout was: {stdout}");
}

#[test]
fn scratch_directory_is_removed_when_the_process_exits() {
    let dir = tempfile::tempdir().unwrap();
    // non-zero exit: the build fails, but the scratch dir was created
    let (compiler, shim) = fake_toolchain(dir.path(), 1);
    fs::write(dir.path().join("main.go"), "package main\n").unwrap();
    let temp_root = dir.path().join("tmp");
    fs::create_dir(&temp_root).unwrap();

    let output = Command::new(bin())
        .current_dir(dir.path())
        .arg("build")
        .arg("main.go")
        .arg("--binary-path")
        .arg(&compiler)
        .arg("--wasm-exec-path")
        .arg(&shim)
        .env("TMPDIR", &temp_root)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(
        scratch_children(&temp_root),
        Vec::<String>::new(),
        "scratch directories survived process exit"
    );
}

#[test]
fn interrupt_signal_removes_the_scratch_directory() {
    let dir = tempfile::tempdir().unwrap();
    // a compiler that never finishes, so the build is mid-flight when the
    // signal arrives
    let compiler = dir.path().join("hanging-go");
    fs::write(&compiler, "#!/bin/sh\nsleep 30\n").unwrap();
    fs::set_permissions(&compiler, fs::Permissions::from_mode(0o755)).unwrap();
    let shim = dir.path().join("wasm_exec.js");
    fs::write(&shim, "globalThis.Go = class Go {}\n").unwrap();
    fs::write(dir.path().join("main.go"), "package main\n").unwrap();
    let temp_root = dir.path().join("tmp");
    fs::create_dir(&temp_root).unwrap();

    let mut child = Command::new(bin())
        .current_dir(dir.path())
        .arg("build")
        .arg("main.go")
        .arg("--binary-path")
        .arg(&compiler)
        .arg("--wasm-exec-path")
        .arg(&shim)
        .env("TMPDIR", &temp_root)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // the scratch directory appears once option resolution has run
    let deadline = Instant::now() + Duration::from_secs(10);
    while scratch_children(&temp_root).is_empty() {
        assert!(
            Instant::now() < deadline,
            "scratch directory never appeared under {}",
            temp_root.display()
        );
        thread::sleep(Duration::from_millis(20));
    }

    let killed = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = child.wait().unwrap();
    // 128 + SIGINT
    assert_eq!(status.code(), Some(130));
    assert_eq!(
        scratch_children(&temp_root),
        Vec::<String>::new(),
        "scratch directories survived the interrupt"
    );
}

#[test]
fn sweep_removes_only_stale_scratch_directories() {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = dir.path().join("tmp");
    let stale = temp_root.join("go-wasm-abc123");
    let unrelated = temp_root.join("important-data");
    fs::create_dir_all(&stale).unwrap();
    fs::create_dir_all(&unrelated).unwrap();

    let output = Command::new(bin())
        .arg("sweep")
        .env("TMPDIR", &temp_root)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!stale.exists());
    assert!(unrelated.is_dir());
}

#[test]
fn shim_command_prints_the_loader_ready_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let (_compiler, shim) = fake_toolchain(dir.path(), 0);

    let output = Command::new(bin())
        .arg("shim")
        .arg("--wasm-exec-path")
        .arg(&shim)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("globalThis.Go = class Go {}"));
    assert!(stdout.contains("const go = new Go()"));
    assert!(stdout.trim_end().ends_with("export default go"));
}
