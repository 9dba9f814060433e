//! Compile orchestration
//!
//! Runs the strategy selector, then carries out whatever it decided:
//!
//! ```text
//! CompileOptions ─▶ selector (blocking thread) ─┬─ UseHost ─────────▶ host.compile()
//!                                               ├─ UseExternalTool ─▶ spawn compiler
//!                                               │                      stdout ─┐
//!                                               │                      stderr ─┴▶ reconstructor ─▶ LogSink
//!                                               └─ Done* ───────────▶ report only
//! ```
//!
//! Host endpoints are synchronous, so negotiation and host compilation run on
//! the blocking pool and the endpoint is handed back afterwards.

use crate::config::AdapterConfig;
use crate::diagnostics::{
    DiagnosticLine, DiagnosticSink, DiagnosticStreamReconstructor, LogSink, MessageImportance,
};
use crate::error::{AdapterError, AdapterResult};
use crate::host::{ExecutionStrategySelector, FailureReason, HostEndpoint, StrategyOutcome};
use crate::invocation::artifacts::{relocate_pdb, resolve_in, FsProbe};
use crate::invocation::command_line::{build_arguments, render};
use crate::invocation::options::CompileOptions;
use serde::Serialize;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Outcome of one compile request
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    pub strategy: StrategyOutcome,
    pub success: bool,
    /// Exit code of the command-line compiler, when it ran
    pub exit_code: Option<i32>,
    pub errors: usize,
    pub warnings: usize,
    pub duration_ms: u64,
    /// Where the PDB was moved to, when it had to be
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdb_relocated_to: Option<PathBuf>,
    /// Normalized compiler output, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<DiagnosticLine>,
}

impl CompileReport {
    pub fn to_json(&self) -> AdapterResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn decided(strategy: StrategyOutcome, success: bool) -> Self {
        Self {
            strategy,
            success,
            exit_code: None,
            errors: 0,
            warnings: 0,
            duration_ms: 0,
            pdb_relocated_to: None,
            diagnostics: Vec::new(),
        }
    }
}

/// Drives a compile request end to end
#[derive(Debug, Clone)]
pub struct CompileOrchestrator {
    config: AdapterConfig,
    selector: ExecutionStrategySelector,
}

impl CompileOrchestrator {
    /// Reference checks resolve relative paths against `working_dir`, the
    /// directory the compiler will run in.
    pub fn new(config: AdapterConfig) -> Self {
        let files = Arc::new(FsProbe::in_dir(config.working_dir.clone()));
        let selector = ExecutionStrategySelector::new(config.selector_policy()).with_probe(files);
        Self { config, selector }
    }

    /// Replace the selector (e.g. to install a different artifact probe)
    pub fn with_selector(mut self, selector: ExecutionStrategySelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Compile with no host attached; always the command-line compiler.
    pub async fn compile_standalone(&self, options: &CompileOptions) -> AdapterResult<CompileReport> {
        let started = Instant::now();
        let strategy = self.selector.select(None, options)?;
        let mut report = match strategy {
            StrategyOutcome::UseExternalTool => self.run_external(options).await?,
            other => CompileReport::decided(other, false),
        };
        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Negotiate with `host` and compile accordingly. The host is returned
    /// so callers can inspect or reuse it.
    pub async fn compile<H>(
        &self,
        options: &CompileOptions,
        host: H,
    ) -> AdapterResult<(CompileReport, H)>
    where
        H: HostEndpoint + Send + 'static,
    {
        let started = Instant::now();

        let selector = self.selector.clone();
        let request = options.clone();
        let (strategy, mut host) = tokio::task::spawn_blocking(move || {
            let mut host = host;
            let strategy = selector.select(Some(&mut host as &mut dyn HostEndpoint), &request);
            (strategy, host)
        })
        .await?;
        let strategy = strategy?;

        let mut report = match strategy {
            StrategyOutcome::UseHost => {
                let (succeeded, returned) = tokio::task::spawn_blocking(move || {
                    let succeeded = host.compile();
                    (succeeded, host)
                })
                .await?;
                host = returned;
                info!(success = succeeded, "Host compiler finished");
                CompileReport::decided(StrategyOutcome::UseHost, succeeded)
            }
            StrategyOutcome::UseExternalTool => self.run_external(options).await?,
            StrategyOutcome::DoneSuccess => CompileReport::decided(StrategyOutcome::DoneSuccess, true),
            StrategyOutcome::DoneFailure(reason) => {
                if let FailureReason::MissingReferences(paths) = &reason {
                    error!(missing = paths.len(), "Cannot fall back to the command-line compiler");
                }
                CompileReport::decided(StrategyOutcome::DoneFailure(reason), false)
            }
        };

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok((report, host))
    }

    /// Launch the command-line compiler and normalize its output.
    ///
    /// On timeout the lines read so far are still logged through `tracing`
    /// (held-back block lines included) but are not returned.
    pub async fn run_external(&self, options: &CompileOptions) -> AdapterResult<CompileReport> {
        let tool = self.config.tool();
        let args: Vec<String> = self
            .config
            .tool_prefix_args
            .iter()
            .cloned()
            .chain(build_arguments(options)?)
            .collect();

        info!(command = %render(&tool, &args), "Launching command-line compiler");

        let mut cmd = Command::new(&tool);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        // Own process group so a timeout kill takes the whole tree.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| AdapterError::tool_launch(&tool, e))?;
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(AdapterError::Task {
                message: "compiler output pipes were not captured".into(),
            });
        };

        let stdout_importance = self.config.stdout_importance;
        let stderr_importance = self.config.stderr_importance;
        let mut sink = LogSink::capturing();
        let mut reconstructor = DiagnosticStreamReconstructor::new();
        let pump = async {
            let mut out = BufReader::new(stdout);
            let mut err = BufReader::new(stderr);
            let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
            let (mut out_open, mut err_open) = (true, true);

            while out_open || err_open {
                tokio::select! {
                    line = next_line(&mut out, &mut out_buf), if out_open => match line? {
                        Some(text) => reconstructor.feed(
                            DiagnosticLine::new(text, stdout_importance),
                            &mut sink,
                        ),
                        None => out_open = false,
                    },
                    line = next_line(&mut err, &mut err_buf), if err_open => match line? {
                        Some(text) => reconstructor.feed(
                            DiagnosticLine::new(text, stderr_importance),
                            &mut sink,
                        ),
                        None => err_open = false,
                    },
                }
            }
            reconstructor.finish(&mut sink);

            let status = child.wait().await?;
            Ok::<ExitStatus, AdapterError>(status)
        };

        let status = if self.config.timeout_secs == 0 {
            pump.await?
        } else {
            let waited =
                tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), pump).await;
            match waited {
                Ok(result) => result?,
                Err(_) => {
                    warn!(secs = self.config.timeout_secs, "Compiler timed out; killing it");
                    reconstructor.finish(&mut sink);
                    debug!(
                        lines = sink.captured().len(),
                        errors = sink.error_count(),
                        "Partial compiler output before timeout"
                    );
                    if let Err(e) = child.start_kill() {
                        debug!(error = %e, "Compiler process already gone");
                    }
                    return Err(AdapterError::ToolTimeout {
                        secs: self.config.timeout_secs,
                    });
                }
            }
        };

        let exit_code = status.code();
        if !status.success() && !sink.has_logged_errors() {
            let code = exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
            sink.emit(DiagnosticLine::new(
                format!("{}: error : compiler exited with code {code}", tool.display()),
                MessageImportance::High,
            ));
        }

        let mut pdb_relocated_to = None;
        let mut relocation_failed = false;
        if let (Some(output), Some(pdb)) = (&options.output_assembly, &options.pdb_file) {
            let base = self.config.working_dir.as_deref();
            match relocate_pdb(&resolve_in(base, output), &resolve_in(base, pdb)) {
                Ok(moved) => pdb_relocated_to = moved,
                Err(e) => {
                    error!(error = %e, pdb = %pdb.display(), "Could not move the PDB file");
                    relocation_failed = true;
                }
            }
        }

        let success = status.success() && !sink.has_logged_errors() && !relocation_failed;
        info!(
            success,
            exit_code = ?exit_code,
            errors = sink.error_count(),
            warnings = sink.warning_count(),
            "Command-line compiler finished"
        );

        Ok(CompileReport {
            strategy: StrategyOutcome::UseExternalTool,
            success,
            exit_code,
            errors: sink.error_count(),
            warnings: sink.warning_count(),
            duration_ms: 0,
            pdb_relocated_to,
            diagnostics: sink.into_captured(),
        })
    }
}

/// Next line without its terminator, decoded lossily. Partial reads stay in
/// `buf`, so the future can be dropped inside `select!` without losing bytes.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    buf.clear();
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, HostScript, ScriptedHost};

    fn config() -> AdapterConfig {
        AdapterConfig {
            tool_path: None,
            tool_name: "vbc-not-installed-anywhere".into(),
            tool_prefix_args: Vec::new(),
            working_dir: None,
            timeout_secs: 5,
            prefer_host: true,
            stdout_importance: MessageImportance::Normal,
            stderr_importance: MessageImportance::Normal,
        }
    }

    fn options() -> CompileOptions {
        CompileOptions {
            sources: vec![PathBuf::from("Module1.vb")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_host_compiles_when_it_covers_everything() {
        let orchestrator = CompileOrchestrator::new(config());
        let (report, host) = orchestrator
            .compile(&options(), ScriptedHost::new(HostScript::default()))
            .await
            .unwrap();

        assert_eq!(report.strategy, StrategyOutcome::UseHost);
        assert!(report.success);
        assert_eq!(host.calls().last(), Some(&HostCall::Compile));
        assert!(host.session_ended());
    }

    #[tokio::test]
    async fn test_host_compile_failure_is_reported() {
        let orchestrator = CompileOrchestrator::new(config());
        let script = HostScript {
            compile_succeeds: false,
            ..Default::default()
        };
        let (report, _) = orchestrator
            .compile(&options(), ScriptedHost::new(script))
            .await
            .unwrap();
        assert_eq!(report.strategy, StrategyOutcome::UseHost);
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_up_to_date_host_skips_compile() {
        let orchestrator = CompileOrchestrator::new(config());
        let script = HostScript {
            up_to_date: true,
            ..Default::default()
        };
        let (report, host) = orchestrator
            .compile(&options(), ScriptedHost::new(script))
            .await
            .unwrap();
        assert_eq!(report.strategy, StrategyOutcome::DoneSuccess);
        assert!(report.success);
        assert!(!host.calls().contains(&HostCall::Compile));
    }

    #[tokio::test]
    async fn test_fatal_host_fault_is_an_error() {
        let orchestrator = CompileOrchestrator::new(config());
        let script = HostScript {
            fatal_on: Some("Sources".into()),
            ..Default::default()
        };
        let err = orchestrator
            .compile(&options(), ScriptedHost::new(script))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "HOST_FATAL");
    }

    #[test]
    fn test_report_json_shape() {
        let report = CompileReport::decided(
            StrategyOutcome::DoneFailure(FailureReason::NegotiationFailed),
            false,
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["strategy"]["done_failure"], "negotiation_failed");
        assert_eq!(value["success"], false);
        assert!(value.get("diagnostics").is_none());
    }

    #[tokio::test]
    async fn test_missing_tool_is_a_launch_error() {
        let orchestrator = CompileOrchestrator::new(config());
        let err = orchestrator.compile_standalone(&options()).await.unwrap_err();
        assert_eq!(err.code(), "TOOL_LAUNCH_FAILED");
    }

    #[tokio::test]
    async fn test_next_line_handles_crlf_and_missing_terminator() {
        let data: &[u8] = b"first\r\nsecond\nlast";
        let mut reader = BufReader::new(data);
        let mut buf = Vec::new();

        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("first"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("second"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("last"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), None);
    }
}
