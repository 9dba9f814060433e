//! Command-line surface of the driver.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use vbc_adapter::{AdapterConfig, DiagnosticLine, DiagnosticSink};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Adapter config file (TOML); environment defaults apply otherwise
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the request described by a TOML file
    Compile {
        request: PathBuf,

        /// Command-line compiler to use; forces it even when a host is attached
        #[arg(long)]
        tool: Option<PathBuf>,

        /// Compiler timeout in seconds (0 = none)
        #[arg(long)]
        timeout: Option<u64>,

        /// Negotiate with a scripted host described by this TOML file
        #[arg(long)]
        host_script: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Normalize compiler output from stdin onto stdout
    Normalize,

    /// Print the command line a request would run
    Args {
        request: PathBuf,

        #[arg(long)]
        tool: Option<PathBuf>,
    },
}

impl Cli {
    /// Config file (or environment defaults) with command-line overrides applied.
    pub fn adapter_config(&self) -> Result<AdapterConfig> {
        let mut config = match &self.config {
            Some(path) => AdapterConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AdapterConfig::default(),
        };

        match &self.command {
            Command::Compile { tool, timeout, .. } => {
                if let Some(tool) = tool {
                    config.tool_path = Some(tool.clone());
                }
                if let Some(secs) = timeout {
                    config.timeout_secs = *secs;
                }
            }
            Command::Args { tool: Some(tool), .. } => config.tool_path = Some(tool.clone()),
            Command::Args { .. } | Command::Normalize => {}
        }
        Ok(config)
    }
}

/// Writes each normalized line as it is emitted. The first write error is
/// kept and later lines are dropped.
pub struct WriterSink<W: Write> {
    out: W,
    error: Option<std::io::Error>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> DiagnosticSink for WriterSink<W> {
    fn emit(&mut self, line: DiagnosticLine) {
        if self.error.is_none() {
            if let Err(e) = writeln!(self.out, "{}", line.text) {
                self.error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbc_adapter::DiagnosticStreamReconstructor;

    #[test]
    fn test_compile_overrides() {
        let cli = Cli::try_parse_from([
            "vbc-driver",
            "compile",
            "request.toml",
            "--tool",
            "/opt/vb/vbc",
            "--timeout",
            "0",
            "--json",
        ])
        .unwrap();

        let config = cli.adapter_config().unwrap();
        assert_eq!(config.tool_path, Some(PathBuf::from("/opt/vb/vbc")));
        assert_eq!(config.timeout_secs, 0);
        assert!(config.selector_policy().force_external_tool);
        assert!(matches!(cli.command, Command::Compile { json: true, .. }));
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let cli = Cli::try_parse_from(["vbc-driver", "--config", "/no/such/file.toml", "normalize"])
            .unwrap();
        let err = cli.adapter_config().unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/file.toml"));
    }

    #[test]
    fn test_writer_sink_streams_normalized_lines() {
        let mut sink = WriterSink::new(Vec::new());
        let mut reconstructor = DiagnosticStreamReconstructor::new();
        for text in ["a.vb(4): error BC30205: End of statement expected.", "", "x y", " ~"] {
            reconstructor.feed(DiagnosticLine::normal(text), &mut sink);
        }
        reconstructor.finish(&mut sink);

        let written = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(
            written,
            "a.vb(4,2): error BC30205: End of statement expected.\n\nx y\n ~\n"
        );
    }
}
