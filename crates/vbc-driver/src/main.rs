mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, WriterSink};
use std::io::BufRead;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;
use vbc_adapter::host::{HostScript, ScriptedHost};
use vbc_adapter::invocation::{build_arguments, render};
use vbc_adapter::{
    AdapterConfig, CompileOptions, CompileOrchestrator, CompileReport, DiagnosticLine,
    DiagnosticStreamReconstructor,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.adapter_config()?;

    match &cli.command {
        Command::Compile {
            request,
            host_script,
            json,
            ..
        } => compile(config, request, host_script.as_deref(), *json).await,
        Command::Normalize => {
            normalize()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Args { request, .. } => {
            let options = load_request(request)?;
            let args: Vec<String> = config
                .tool_prefix_args
                .iter()
                .cloned()
                .chain(build_arguments(&options)?)
                .collect();
            println!("{}", render(&config.tool(), &args));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_request(path: &Path) -> Result<CompileOptions> {
    CompileOptions::from_toml_file(path)
        .with_context(|| format!("loading compile request {}", path.display()))
}

async fn compile(
    config: AdapterConfig,
    request: &Path,
    host_script: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let options = load_request(request)?;
    info!(
        request = %request.display(),
        sources = options.sources.len(),
        tool = %config.tool().display(),
        "Compile request loaded"
    );

    let orchestrator = CompileOrchestrator::new(config);
    let report = match host_script {
        Some(path) => {
            let script = HostScript::from_toml_file(path)
                .with_context(|| format!("loading host script {}", path.display()))?;
            let (report, _host) = orchestrator
                .compile(&options, ScriptedHost::new(script))
                .await?;
            report
        }
        None => orchestrator.compile_standalone(&options).await?,
    };

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
    }

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(report: &CompileReport) {
    for line in &report.diagnostics {
        println!("{line}");
    }
    println!(
        "{}: {} ({} error(s), {} warning(s), {} ms)",
        report.strategy,
        if report.success { "succeeded" } else { "failed" },
        report.errors,
        report.warnings,
        report.duration_ms
    );
}

/// Stream stdin through the reconstructor. Bytes that are not UTF-8 are
/// replaced rather than rejected.
fn normalize() -> Result<()> {
    let stdin = std::io::stdin();
    let mut sink = WriterSink::new(std::io::stdout().lock());
    let mut reconstructor = DiagnosticStreamReconstructor::new();

    for chunk in stdin.lock().split(b'\n') {
        let chunk = chunk.context("reading stdin")?;
        let text = String::from_utf8_lossy(&chunk)
            .trim_end_matches('\r')
            .to_string();
        reconstructor.feed(DiagnosticLine::normal(text), &mut sink);
    }
    reconstructor.finish(&mut sink);

    sink.finish().context("writing stdout")?;
    Ok(())
}
