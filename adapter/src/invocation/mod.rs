//! Compile request handling
//!
//! - `options`: the request model and its host parameter list
//! - `command_line`: request → command-line compiler switches
//! - `artifacts`: reference checks and PDB relocation
//! - `orchestrator`: runs the selected strategy end to end

pub mod artifacts;
pub mod command_line;
pub mod options;
pub mod orchestrator;

pub use artifacts::{missing_references, relocate_pdb, resolve_in, ArtifactProbe, FsProbe};
pub use command_line::{build_arguments, render, CommandLineBuilder};
pub use options::{CompileOptions, OptionCompare, TargetType, Verbosity};
pub use orchestrator::{CompileOrchestrator, CompileReport};
