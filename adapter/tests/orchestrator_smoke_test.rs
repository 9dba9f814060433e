//! Smoke tests for the compile orchestrator against a stand-in compiler.
//!
//! The "compiler" is a small shell script launched through `sh`, so these
//! only run on unix.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vbc_adapter::host::{HostCall, HostScript, ScriptedHost, StrategyOutcome};
use vbc_adapter::{AdapterConfig, CompileOptions, CompileOrchestrator, MessageImportance};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("vbc_adapter=debug")
        .try_init();
}

/// Write `body` as a script and point the orchestrator at `sh <script>`.
fn orchestrator(dir: &Path, body: &str, timeout_secs: u64) -> CompileOrchestrator {
    let script = dir.join("fake-vbc.sh");
    std::fs::write(&script, body).unwrap();
    CompileOrchestrator::new(AdapterConfig {
        tool_path: None,
        tool_name: "sh".into(),
        tool_prefix_args: vec![script.display().to_string()],
        working_dir: Some(dir.to_path_buf()),
        timeout_secs,
        prefer_host: true,
        stdout_importance: MessageImportance::Normal,
        stderr_importance: MessageImportance::High,
    })
}

/// Fixture file the script `cat`s, avoiding shell quoting of diagnostics.
fn fixture(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

fn options(dir: &Path) -> CompileOptions {
    CompileOptions {
        sources: vec![dir.join("Module1.vb")],
        output_assembly: Some(dir.join("App.exe")),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_caret_block_is_reconstructed_and_counted() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let out = fixture(
        dir.path(),
        "stdout.txt",
        &[
            "Microsoft (R) Visual Basic Compiler version 4.0",
            "Module1.vb(7) : error BC30451: 'y' is not declared.",
            "",
            "        Dim x = y + 1",
            "                ~",
        ],
    );
    let orchestrator = orchestrator(
        dir.path(),
        &format!("cat '{}'\nexit 1\n", out.display()),
        30,
    );

    let report = orchestrator.compile_standalone(&options(dir.path())).await.unwrap();

    assert_eq!(report.strategy, StrategyOutcome::UseExternalTool);
    assert!(!report.success);
    assert_eq!(report.exit_code, Some(1));
    assert_eq!(report.errors, 1, "no synthesized error when the compiler logged one");
    assert_eq!(report.diagnostics.len(), 5);
    assert_eq!(
        report.diagnostics[1].text,
        "Module1.vb(7,17) : error BC30451: 'y' is not declared."
    );
}

#[tokio::test]
async fn test_silent_failure_gets_an_error_line() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(dir.path(), "exit 3\n", 30);

    let report = orchestrator.compile_standalone(&options(dir.path())).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.exit_code, Some(3));
    assert_eq!(report.errors, 1);
    let last = report.diagnostics.last().unwrap();
    assert!(last.text.contains("exited with code 3"), "{}", last.text);
    assert_eq!(last.importance, MessageImportance::High);
}

#[tokio::test]
async fn test_success_with_stderr_warning_and_pdb_move() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("symbols")).unwrap();
    let err = fixture(
        dir.path(),
        "stderr.txt",
        &["Module1.vb(2,5) : warning BC42024: Unused local variable: 'z'."],
    );
    let script = format!(
        "cat '{}' >&2\ntouch '{}'\nexit 0\n",
        err.display(),
        dir.path().join("App.pdb").display()
    );
    let orchestrator = orchestrator(dir.path(), &script, 30);
    let options = CompileOptions {
        pdb_file: Some(dir.path().join("symbols").join("App")),
        ..options(dir.path())
    };

    let report = orchestrator.compile_standalone(&options).await.unwrap();

    assert!(report.success);
    assert_eq!(report.warnings, 1);
    assert_eq!(report.diagnostics[0].importance, MessageImportance::High);

    let moved = dir.path().join("symbols").join("App.pdb");
    assert_eq!(report.pdb_relocated_to, Some(moved.clone()));
    assert!(moved.exists());
    assert!(!dir.path().join("App.pdb").exists());
}

#[tokio::test]
async fn test_hung_compiler_times_out() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(dir.path(), "sleep 30\n", 1);

    let err = orchestrator
        .compile_standalone(&options(dir.path()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TOOL_TIMEOUT");
}

#[tokio::test]
async fn test_timeout_inside_held_back_block() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let out = fixture(
        dir.path(),
        "stdout.txt",
        &["Module1.vb(4) : error BC30451: 'q' is not declared.", ""],
    );
    let orchestrator = orchestrator(
        dir.path(),
        &format!("cat '{}'\nsleep 30\n", out.display()),
        1,
    );

    let started = std::time::Instant::now();
    let err = orchestrator
        .compile_standalone(&options(dir.path()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TOOL_TIMEOUT");
    assert!(started.elapsed() < std::time::Duration::from_secs(20));
}

#[tokio::test]
async fn test_partial_host_coverage_runs_the_tool() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(dir.path(), "exit 0\n", 30);
    let host = ScriptedHost::new(HostScript {
        unsupported: vec!["Win32Icon".into()],
        ..Default::default()
    });

    let (report, host) = orchestrator.compile(&options(dir.path()), host).await.unwrap();

    assert_eq!(report.strategy, StrategyOutcome::UseExternalTool);
    assert!(report.success);
    assert_eq!(report.exit_code, Some(0));
    assert!(!host.calls().contains(&HostCall::Compile));
}

#[tokio::test]
async fn test_relative_references_are_found_in_working_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Helpers.dll"), b"MZ").unwrap();
    let orchestrator = orchestrator(dir.path(), "exit 0\n", 30);
    let host = ScriptedHost::new(HostScript {
        unsupported: vec!["Optimize".into()],
        ..Default::default()
    });
    let options = CompileOptions {
        sources: vec![PathBuf::from("Module1.vb")],
        references: vec![PathBuf::from("Helpers.dll")],
        ..Default::default()
    };

    let (report, _) = orchestrator.compile(&options, host).await.unwrap();

    assert_eq!(report.strategy, StrategyOutcome::UseExternalTool);
    assert!(report.success);
}

#[tokio::test]
async fn test_relative_pdb_paths_resolve_in_working_dir() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(dir.path(), "echo pdb > App.pdb\nexit 0\n", 30);
    let options = CompileOptions {
        sources: vec![PathBuf::from("Module1.vb")],
        output_assembly: Some(PathBuf::from("App.exe")),
        pdb_file: Some(PathBuf::from("Custom.pdb")),
        ..Default::default()
    };

    let report = orchestrator.compile_standalone(&options).await.unwrap();

    let moved = dir.path().join("Custom.pdb");
    assert!(report.success);
    assert_eq!(report.pdb_relocated_to, Some(moved.clone()));
    assert!(moved.exists());
    assert!(!dir.path().join("App.pdb").exists());
}
