//! Compile request options
//!
//! One struct carries every option the adapter knows about. It is offered to
//! the host endpoint as a parameter list and serialized into switches for the
//! command-line compiler. Request files are TOML:
//!
//! ```toml
//! sources = ["Module1.vb"]
//! references = ["lib/Util.dll"]
//! output_assembly = "bin/App.exe"
//! target_type = "exe"
//! option_strict = true
//! ```

use crate::error::AdapterResult;
use crate::host::{HostParameter, ParameterValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Output kind (`/target:`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Exe,
    WinExe,
    Library,
    Module,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exe => write!(f, "exe"),
            Self::WinExe => write!(f, "winexe"),
            Self::Library => write!(f, "library"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// String comparison mode (`/optioncompare:`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionCompare {
    Binary,
    Text,
}

impl fmt::Display for OptionCompare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Compiler console verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// All options of one compile request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub sources: Vec<PathBuf>,
    pub references: Vec<PathBuf>,
    pub add_modules: Vec<PathBuf>,
    pub output_assembly: Option<PathBuf>,
    pub target_type: Option<TargetType>,
    /// Conditional compilation constants, e.g. `DEBUG=-1,TRACE=-1`
    pub define_constants: Option<String>,
    pub imports: Vec<String>,
    pub root_namespace: Option<String>,
    pub main_entry_point: Option<String>,
    pub option_explicit: Option<bool>,
    pub option_strict: Option<bool>,
    pub option_infer: Option<bool>,
    pub option_compare: Option<OptionCompare>,
    pub emit_debug_information: Option<bool>,
    /// `full`, `pdbonly` or `portable`
    pub debug_type: Option<String>,
    /// Desired PDB location when it differs from `<output>.pdb`
    pub pdb_file: Option<PathBuf>,
    pub documentation_file: Option<PathBuf>,
    pub optimize: Option<bool>,
    pub remove_integer_checks: Option<bool>,
    pub treat_warnings_as_errors: bool,
    pub warnings_as_errors: Vec<String>,
    pub warnings_not_as_errors: Vec<String>,
    pub disabled_warnings: Vec<String>,
    /// Suppress all warnings
    pub no_warnings: bool,
    pub platform: Option<String>,
    pub lang_version: Option<String>,
    pub key_file: Option<PathBuf>,
    pub key_container: Option<String>,
    pub delay_sign: Option<bool>,
    pub resources: Vec<PathBuf>,
    pub link_resources: Vec<PathBuf>,
    pub win32_icon: Option<PathBuf>,
    pub win32_resource: Option<PathBuf>,
    pub additional_lib_paths: Vec<PathBuf>,
    pub sdk_path: Option<PathBuf>,
    pub no_standard_lib: bool,
    /// `embed`, `none`, `default` or a path to a runtime assembly
    pub vb_runtime: Option<String>,
    pub code_page: Option<u32>,
    pub utf8_output: bool,
    pub no_logo: bool,
    pub verbosity: Option<Verbosity>,
    /// Free-text switches appended as-is (split shell-style)
    pub additional_options: Option<String>,
}

impl CompileOptions {
    /// Load a request from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> AdapterResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Inputs that must exist on disk before the command-line compiler runs
    pub fn referenced_artifacts(&self) -> Vec<PathBuf> {
        self.references.clone()
    }

    /// The parameter list offered to a host endpoint, in negotiation order.
    pub fn host_parameters(&self) -> Vec<HostParameter> {
        use ParameterValue::{Flag, List, Number, Text};

        vec![
            HostParameter::new("AdditionalLibPaths", List(paths(&self.additional_lib_paths))),
            HostParameter::new("AddModules", List(paths(&self.add_modules))),
            HostParameter::new("CodePage", Number(self.code_page)),
            HostParameter::new("DebugType", Text(self.debug_type.clone())),
            HostParameter::new("DefineConstants", Text(self.define_constants.clone())),
            HostParameter::new("DelaySign", Flag(self.delay_sign)),
            HostParameter::new("DisabledWarnings", List(self.disabled_warnings.clone())),
            HostParameter::new("DocumentationFile", Text(path(&self.documentation_file))),
            HostParameter::new("EmitDebugInformation", Flag(self.emit_debug_information)),
            HostParameter::new("Imports", List(self.imports.clone())),
            HostParameter::new("KeyContainer", Text(self.key_container.clone())),
            HostParameter::new("KeyFile", Text(path(&self.key_file))),
            HostParameter::new("LangVersion", Text(self.lang_version.clone())),
            HostParameter::new("LinkResources", List(paths(&self.link_resources))),
            HostParameter::new("MainEntryPoint", Text(self.main_entry_point.clone())),
            HostParameter::new("NoStandardLib", Flag(Some(self.no_standard_lib))),
            HostParameter::new("NoWarnings", Flag(Some(self.no_warnings))),
            HostParameter::new("Optimize", Flag(self.optimize)),
            HostParameter::new(
                "OptionCompare",
                Text(self.option_compare.map(|c| c.to_string())),
            ),
            HostParameter::new("OptionExplicit", Flag(self.option_explicit)),
            HostParameter::new("OptionInfer", Flag(self.option_infer)),
            HostParameter::new("OptionStrict", Flag(self.option_strict)),
            HostParameter::new("OutputAssembly", Text(path(&self.output_assembly))),
            HostParameter::new("PdbFile", Text(path(&self.pdb_file))),
            HostParameter::new("Platform", Text(self.platform.clone())),
            HostParameter::new("References", List(paths(&self.references))),
            HostParameter::new("RemoveIntegerChecks", Flag(self.remove_integer_checks)),
            HostParameter::new("Resources", List(paths(&self.resources))),
            HostParameter::new("RootNamespace", Text(self.root_namespace.clone())),
            HostParameter::new("SdkPath", Text(path(&self.sdk_path))),
            HostParameter::new("Sources", List(paths(&self.sources))),
            HostParameter::new(
                "TargetType",
                Text(self.target_type.map(|t| t.to_string())),
            ),
            HostParameter::new(
                "TreatWarningsAsErrors",
                Flag(Some(self.treat_warnings_as_errors)),
            ),
            HostParameter::new("WarningsAsErrors", List(self.warnings_as_errors.clone())),
            HostParameter::new(
                "WarningsNotAsErrors",
                List(self.warnings_not_as_errors.clone()),
            ),
            HostParameter::new("VBRuntime", Text(self.vb_runtime.clone())),
            HostParameter::new("Win32Icon", Text(path(&self.win32_icon))),
            HostParameter::new("Win32Resource", Text(path(&self.win32_resource))),
            HostParameter::new("AdditionalOptions", Text(self.additional_options.clone())),
        ]
    }
}

fn path(p: &Option<PathBuf>) -> Option<String> {
    p.as_ref().map(|p| p.display().to_string())
}

fn paths(items: &[PathBuf]) -> Vec<String> {
    items.iter().map(|p| p.display().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_request_from_toml() {
        let options = CompileOptions::from_toml_str(
            r#"
            sources = ["Module1.vb", "Util.vb"]
            references = ["lib/Helpers.dll"]
            output_assembly = "bin/App.exe"
            target_type = "winexe"
            option_compare = "text"
            option_strict = true
            "#,
        )
        .unwrap();

        assert_eq!(options.sources.len(), 2);
        assert_eq!(options.target_type, Some(TargetType::WinExe));
        assert_eq!(options.option_compare, Some(OptionCompare::Text));
        assert_eq!(options.option_strict, Some(true));
        assert_eq!(options.optimize, None);
        assert_eq!(
            options.referenced_artifacts(),
            vec![PathBuf::from("lib/Helpers.dll")]
        );
    }

    #[test]
    fn test_rejects_unknown_target() {
        let err = CompileOptions::from_toml_str(r#"target_type = "applet""#).unwrap_err();
        assert_eq!(err.code(), "TOML_ERROR");
    }

    #[test]
    fn test_host_parameters_cover_every_option() {
        let options = CompileOptions {
            sources: vec![PathBuf::from("a.vb")],
            optimize: Some(true),
            ..Default::default()
        };
        let params = options.host_parameters();

        let names: Vec<&str> = params.iter().map(|p| p.name).collect();
        assert!(names.contains(&"Sources"));
        assert!(names.contains(&"AdditionalOptions"));

        let optimize = params.iter().find(|p| p.name == "Optimize").unwrap();
        assert_eq!(optimize.value, ParameterValue::Flag(Some(true)));
        assert!(optimize.value.is_set());

        let key_file = params.iter().find(|p| p.name == "KeyFile").unwrap();
        assert!(!key_file.value.is_set());
    }
}
