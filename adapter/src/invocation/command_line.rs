//! Compile options → command-line compiler switches.
//!
//! Arguments are passed to the process as discrete argv entries, so values
//! are never shell-quoted here. [`render`] quotes only for display.

use crate::error::{AdapterError, AdapterResult};
use crate::invocation::options::{CompileOptions, Verbosity};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Accumulates `/switch[:value]` arguments
#[derive(Debug, Default)]
pub struct CommandLineBuilder {
    args: Vec<String>,
}

impl CommandLineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switch(&mut self, name: &str) -> &mut Self {
        self.args.push(format!("/{name}"));
        self
    }

    pub fn switch_if(&mut self, name: &str, condition: bool) -> &mut Self {
        if condition {
            self.switch(name);
        }
        self
    }

    /// `/name+` or `/name-`; nothing when unset
    pub fn switch_toggle(&mut self, name: &str, value: Option<bool>) -> &mut Self {
        if let Some(on) = value {
            self.args
                .push(format!("/{name}{}", if on { '+' } else { '-' }));
        }
        self
    }

    pub fn switch_value(&mut self, name: &str, value: Option<impl Display>) -> &mut Self {
        if let Some(v) = value {
            let v = v.to_string();
            if !v.is_empty() {
                self.args.push(format!("/{name}:{v}"));
            }
        }
        self
    }

    pub fn switch_path(&mut self, name: &str, value: Option<&Path>) -> &mut Self {
        self.switch_value(name, value.map(Path::display))
    }

    /// One switch with a comma-separated value list
    pub fn switch_joined(&mut self, name: &str, items: &[String]) -> &mut Self {
        if !items.is_empty() {
            self.args.push(format!("/{name}:{}", items.join(",")));
        }
        self
    }

    /// One switch per path
    pub fn switch_each(&mut self, name: &str, paths: &[PathBuf]) -> &mut Self {
        for p in paths {
            self.args.push(format!("/{name}:{}", p.display()));
        }
        self
    }

    pub fn raw(&mut self, args: impl IntoIterator<Item = String>) -> &mut Self {
        self.args.extend(args);
        self
    }

    pub fn build(&mut self) -> Vec<String> {
        std::mem::take(&mut self.args)
    }
}

fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

/// `/vbruntime` has keyword forms besides a path.
fn vb_runtime_switch(builder: &mut CommandLineBuilder, value: Option<&str>) {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("") => {}
        Some("embed") => {
            builder.switch("vbruntime*");
        }
        Some("none") => {
            builder.switch("vbruntime-");
        }
        Some("default") => {
            builder.switch("vbruntime+");
        }
        Some(_) => {
            builder.switch_value("vbruntime", value);
        }
    }
}

/// Serialize every option into compiler arguments, sources last.
pub fn build_arguments(options: &CompileOptions) -> AdapterResult<Vec<String>> {
    let mut b = CommandLineBuilder::new();

    b.switch_if("nologo", options.no_logo)
        .switch_if("utf8output", options.utf8_output)
        .switch_value("target", options.target_type)
        .switch_path("out", options.output_assembly.as_deref())
        .switch_value("rootnamespace", options.root_namespace.as_deref())
        .switch_value("main", options.main_entry_point.as_deref())
        .switch_value("define", options.define_constants.as_deref())
        .switch_joined("imports", &options.imports)
        .switch_toggle("optionexplicit", options.option_explicit)
        .switch_toggle("optionstrict", options.option_strict)
        .switch_toggle("optioninfer", options.option_infer)
        .switch_value("optioncompare", options.option_compare)
        .switch_toggle("debug", options.emit_debug_information)
        .switch_value("debug", options.debug_type.as_deref())
        .switch_path("doc", options.documentation_file.as_deref())
        .switch_toggle("optimize", options.optimize)
        .switch_toggle("removeintchecks", options.remove_integer_checks)
        .switch_value("platform", options.platform.as_deref())
        .switch_value("langversion", options.lang_version.as_deref())
        .switch_path("keyfile", options.key_file.as_deref())
        .switch_value("keycontainer", options.key_container.as_deref())
        .switch_toggle("delaysign", options.delay_sign)
        .switch_value("codepage", options.code_page)
        .switch_path("win32icon", options.win32_icon.as_deref())
        .switch_path("win32resource", options.win32_resource.as_deref())
        .switch_path("sdkpath", options.sdk_path.as_deref())
        .switch_if("nostdlib", options.no_standard_lib)
        .switch_joined("libpath", &path_strings(&options.additional_lib_paths));

    vb_runtime_switch(&mut b, options.vb_runtime.as_deref());

    if options.no_warnings {
        b.switch("nowarn");
    } else {
        b.switch_joined("nowarn", &options.disabled_warnings);
    }

    if options.treat_warnings_as_errors {
        b.switch("warnaserror+");
    } else {
        b.switch_joined("warnaserror+", &options.warnings_as_errors);
    }
    b.switch_joined("warnaserror-", &options.warnings_not_as_errors);

    match options.verbosity {
        Some(Verbosity::Quiet) => {
            b.switch("quiet");
        }
        Some(Verbosity::Verbose) => {
            b.switch("verbose");
        }
        Some(Verbosity::Normal) | None => {}
    }

    b.switch_each("reference", &options.references)
        .switch_joined("addmodule", &path_strings(&options.add_modules))
        .switch_each("resource", &options.resources)
        .switch_each("linkresource", &options.link_resources);

    if let Some(extra) = options.additional_options.as_deref() {
        let split = shlex::split(extra).ok_or_else(|| {
            AdapterError::config(format!("unbalanced quoting in additional options: {extra}"))
        })?;
        b.raw(split);
    }

    b.raw(path_strings(&options.sources));
    Ok(b.build())
}

/// Shell-quoted single-line form for logs and `args` output
pub fn render(program: &Path, args: &[String]) -> String {
    let program = program.display().to_string();
    let words = std::iter::once(program.as_str()).chain(args.iter().map(String::as_str));
    shlex::try_join(words).unwrap_or_else(|_| {
        std::iter::once(program.clone())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::options::{OptionCompare, TargetType};

    #[test]
    fn test_minimal_request() {
        let options = CompileOptions {
            sources: vec![PathBuf::from("Module1.vb")],
            output_assembly: Some(PathBuf::from("bin/App.exe")),
            target_type: Some(TargetType::Exe),
            ..Default::default()
        };
        assert_eq!(
            build_arguments(&options).unwrap(),
            vec!["/target:exe", "/out:bin/App.exe", "Module1.vb"]
        );
    }

    #[test]
    fn test_toggles_and_lists() {
        let options = CompileOptions {
            option_strict: Some(true),
            option_infer: Some(false),
            option_compare: Some(OptionCompare::Text),
            imports: vec!["System".into(), "System.Linq".into()],
            disabled_warnings: vec!["42016".into(), "42017".into()],
            references: vec![PathBuf::from("a.dll"), PathBuf::from("b.dll")],
            ..Default::default()
        };
        let args = build_arguments(&options).unwrap();
        assert!(args.contains(&"/optionstrict+".to_string()));
        assert!(args.contains(&"/optioninfer-".to_string()));
        assert!(args.contains(&"/optioncompare:text".to_string()));
        assert!(args.contains(&"/imports:System,System.Linq".to_string()));
        assert!(args.contains(&"/nowarn:42016,42017".to_string()));
        assert!(args.contains(&"/reference:a.dll".to_string()));
        assert!(args.contains(&"/reference:b.dll".to_string()));
    }

    #[test]
    fn test_no_warnings_overrides_list() {
        let options = CompileOptions {
            no_warnings: true,
            disabled_warnings: vec!["42016".into()],
            treat_warnings_as_errors: true,
            warnings_as_errors: vec!["42020".into()],
            ..Default::default()
        };
        let args = build_arguments(&options).unwrap();
        assert!(args.contains(&"/nowarn".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("/nowarn:")));
        assert!(args.contains(&"/warnaserror+".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("/warnaserror+:")));
    }

    #[test]
    fn test_vb_runtime_keywords() {
        for (value, expected) in [
            ("Embed", "/vbruntime*"),
            ("none", "/vbruntime-"),
            ("Default", "/vbruntime+"),
            ("lib/Microsoft.VisualBasic.dll", "/vbruntime:lib/Microsoft.VisualBasic.dll"),
        ] {
            let options = CompileOptions {
                vb_runtime: Some(value.into()),
                ..Default::default()
            };
            assert_eq!(build_arguments(&options).unwrap(), vec![expected]);
        }
    }

    #[test]
    fn test_additional_options_are_split_before_sources() {
        let options = CompileOptions {
            sources: vec![PathBuf::from("a.vb")],
            additional_options: Some(r#"/define:"A=1" /highentropyva+"#.into()),
            ..Default::default()
        };
        assert_eq!(
            build_arguments(&options).unwrap(),
            vec!["/define:A=1", "/highentropyva+", "a.vb"]
        );

        let bad = CompileOptions {
            additional_options: Some("\"unterminated".into()),
            ..Default::default()
        };
        assert_eq!(build_arguments(&bad).unwrap_err().code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_render_quotes_spaces() {
        let line = render(
            Path::new("vbc"),
            &["/out:My App.exe".to_string(), "a.vb".to_string()],
        );
        assert_ne!(line, "vbc /out:My App.exe a.vb");
        assert_eq!(
            shlex::split(&line).unwrap(),
            vec!["vbc", "/out:My App.exe", "a.vb"]
        );
    }
}
