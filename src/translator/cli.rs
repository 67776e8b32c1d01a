// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};

use crate::core::engine::{ErrorPolicy, UnitConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str =
    "Table-driven lowering of structured stack-machine instructions into JVM assembler primitives.

Each input is one translation unit: one instruction per line, whitespace-separated
operand fields, ';' starts a comment. Labels stand alone on their line.
The listing (text or JSON) goes to stdout; diagnostics go to stderr unless
redirected with -E/--error or disabled with --no-error.
The owning class name defaults to the input file stem.";

#[derive(Parser, Debug)]
#[command(
    name = "lowerforge",
    version = VERSION,
    about = "Macro-expand wasm-style instructions into JVM primitives",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        short = 'L',
        long = "library",
        value_name = "NAME",
        long_help = "Macro library to translate with (name or alias). Defaults to wasm32MVP."
    )]
    pub library: Option<String>,
    #[arg(
        long = "class",
        value_name = "NAME",
        long_help = "Owning class name used to qualify relative owners. Defaults to the input file stem."
    )]
    pub class_name: Option<String>,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Select listing output format. text is default; json emits one listing object per input."
    )]
    pub format: OutputFormat,
    #[arg(
        long = "keep-going",
        action = ArgAction::SetTrue,
        long_help = "Continue after a failed instruction instead of stopping the unit at the first error."
    )]
    pub keep_going: bool,
    #[arg(
        short = 'E',
        long = "error",
        value_name = "FILE",
        long_help = "Write diagnostics to FILE instead of stderr."
    )]
    pub error_file: Option<PathBuf>,
    #[arg(
        long = "error-append",
        action = ArgAction::SetTrue,
        requires = "error_file",
        long_help = "Append diagnostics to --error FILE instead of truncating it."
    )]
    pub error_append: bool,
    #[arg(
        long = "no-error",
        action = ArgAction::SetTrue,
        conflicts_with_all = ["error_file", "error_append"],
        long_help = "Disable all diagnostic output routing."
    )]
    pub no_error: bool,
    #[arg(
        short = 'w',
        long = "no-warn",
        action = ArgAction::SetTrue,
        conflicts_with = "warn_error",
        long_help = "Suppress warning diagnostics."
    )]
    pub no_warn: bool,
    #[arg(
        long = "Werror",
        action = ArgAction::SetTrue,
        conflicts_with = "no_warn",
        long_help = "Treat warnings as errors (non-zero exit status)."
    )]
    pub warn_error: bool,
    #[arg(
        long = "list-libraries",
        action = ArgAction::SetTrue,
        long_help = "Print the registered macro libraries and exit."
    )]
    pub list_libraries: bool,
    #[arg(
        long = "list-mnemonics",
        action = ArgAction::SetTrue,
        long_help = "Print the invocable mnemonics of the selected library and exit."
    )]
    pub list_mnemonics: bool,
    #[arg(value_name = "INPUT", long_help = "Source files to translate.")]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum DiagnosticsSinkConfig {
    Stderr,
    File { path: PathBuf, append: bool },
    Disabled,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WarningPolicy {
    pub emit_warnings: bool,
    pub treat_warnings_as_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// What the command does once arguments are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliAction {
    ListLibraries,
    ListMnemonics,
    Translate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    message: String,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub action: CliAction,
    pub library: Option<String>,
    pub class_override: Option<String>,
    pub input_paths: Vec<PathBuf>,
    pub error_policy: ErrorPolicy,
    pub output_format: OutputFormat,
    pub diagnostics_sink: DiagnosticsSinkConfig,
    pub warning_policy: WarningPolicy,
}

impl CliConfig {
    /// Unit configuration for one input.
    pub fn unit_config(&self, input: &Path) -> UnitConfig {
        let class_name = self
            .class_override
            .clone()
            .or_else(|| {
                input
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| UnitConfig::default().class_name);
        UnitConfig {
            class_name,
            error_policy: self.error_policy,
            warnings_as_errors: self.warning_policy.treat_warnings_as_errors,
        }
    }
}

fn parse_env_bool(var_name: &str) -> Result<Option<bool>, CliError> {
    let Some(raw) = env::var_os(var_name) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy().trim().to_ascii_lowercase();
    let parsed = match value.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        "" => None,
        _ => {
            return Err(CliError::new(format!(
                "Invalid boolean value for {var_name}: {value}"
            )))
        }
    };
    Ok(parsed)
}

fn parse_env_path(var_name: &str) -> Result<Option<PathBuf>, CliError> {
    Ok(parse_env_string(var_name)?.map(PathBuf::from))
}

fn parse_env_string(var_name: &str) -> Result<Option<String>, CliError> {
    let Some(raw) = env::var_os(var_name) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy().trim().to_string();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Validate CLI arguments and return parsed configuration.
pub fn validate_cli(cli: &Cli) -> Result<CliConfig, CliError> {
    let env_library = parse_env_string("LOWERFORGE_LIBRARY")?;
    let env_class = parse_env_string("LOWERFORGE_CLASS")?;
    let env_keep_going = parse_env_bool("LOWERFORGE_KEEP_GOING")?;
    let env_no_warn = parse_env_bool("LOWERFORGE_NO_WARN")?;
    let env_warn_error = parse_env_bool("LOWERFORGE_WERROR")?;
    let env_error_file = parse_env_path("LOWERFORGE_ERROR_FILE")?;

    let action = if cli.list_libraries {
        CliAction::ListLibraries
    } else if cli.list_mnemonics {
        CliAction::ListMnemonics
    } else {
        CliAction::Translate
    };
    if action == CliAction::Translate && cli.inputs.is_empty() {
        return Err(CliError::new(
            "No input files. Pass at least one INPUT or use --list-libraries/--list-mnemonics.",
        ));
    }

    let class_override = cli.class_name.clone().or(env_class);
    if class_override.is_some() && cli.inputs.len() > 1 {
        return Err(CliError::new(
            "--class cannot be used with multiple inputs; class names default to each input's file stem",
        ));
    }

    let keep_going = cli.keep_going || env_keep_going.unwrap_or(false);

    let effective_no_warn = if cli.no_warn {
        true
    } else if cli.warn_error {
        false
    } else {
        env_no_warn.unwrap_or(false)
    };
    let effective_warn_error = if cli.warn_error {
        true
    } else if effective_no_warn {
        false
    } else {
        env_warn_error.unwrap_or(false)
    };

    let diagnostics_sink = if cli.no_error {
        DiagnosticsSinkConfig::Disabled
    } else if let Some(path) = cli.error_file.clone().or(env_error_file) {
        DiagnosticsSinkConfig::File {
            path,
            append: cli.error_append,
        }
    } else {
        DiagnosticsSinkConfig::Stderr
    };

    Ok(CliConfig {
        action,
        library: cli.library.clone().or(env_library),
        class_override,
        input_paths: cli.inputs.clone(),
        error_policy: if keep_going {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::Abort
        },
        output_format: cli.format,
        diagnostics_sink,
        warning_policy: WarningPolicy {
            emit_warnings: !effective_no_warn,
            treat_warnings_as_errors: effective_warn_error,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};

    fn with_env_vars(vars: &[(&str, Option<&str>)], test: impl FnOnce()) {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let _guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .expect("lock env mutex");

        let saved: Vec<(String, Option<OsString>)> = vars
            .iter()
            .map(|(key, _)| (key.to_string(), env::var_os(key)))
            .collect();

        for (key, value) in vars {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }

        test();

        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }

    #[test]
    fn validate_cli_defaults_to_abort_and_stderr() {
        with_env_vars(&[("LOWERFORGE_KEEP_GOING", None), ("LOWERFORGE_ERROR_FILE", None)], || {
            let cli = Cli::parse_from(["lowerforge", "prog.wat"]);
            let config = validate_cli(&cli).expect("validate cli");
            assert_eq!(config.action, CliAction::Translate);
            assert_eq!(config.error_policy, ErrorPolicy::Abort);
            assert_eq!(config.output_format, OutputFormat::Text);
            assert!(matches!(config.diagnostics_sink, DiagnosticsSinkConfig::Stderr));
            assert_eq!(config.unit_config(Path::new("dir/prog.wat")).class_name, "prog");
        });
    }

    #[test]
    fn validate_cli_sets_diagnostics_and_warning_policy() {
        with_env_vars(&[], || {
            let cli = Cli::parse_from([
                "lowerforge",
                "-L",
                "asm",
                "--class",
                "Demo",
                "--format",
                "json",
                "--keep-going",
                "-E",
                "diag.log",
                "--error-append",
                "--Werror",
                "prog.asm",
            ]);
            let config = validate_cli(&cli).expect("validate cli");
            assert_eq!(config.library.as_deref(), Some("asm"));
            assert_eq!(config.output_format, OutputFormat::Json);
            assert_eq!(config.error_policy, ErrorPolicy::Continue);
            match &config.diagnostics_sink {
                DiagnosticsSinkConfig::File { path, append } => {
                    assert_eq!(path, &PathBuf::from("diag.log"));
                    assert!(*append);
                }
                other => panic!("unexpected diagnostics sink: {other:?}"),
            }
            assert!(config.warning_policy.emit_warnings);
            assert!(config.warning_policy.treat_warnings_as_errors);
            let unit = config.unit_config(Path::new("prog.asm"));
            assert_eq!(unit.class_name, "Demo");
            assert!(unit.warnings_as_errors);
        });
    }

    #[test]
    fn validate_cli_no_warn_disables_warnings() {
        with_env_vars(&[], || {
            let cli = Cli::parse_from(["lowerforge", "-w", "prog.wat"]);
            let config = validate_cli(&cli).expect("validate cli");
            assert!(!config.warning_policy.emit_warnings);
            assert!(!config.warning_policy.treat_warnings_as_errors);
        });
    }

    #[test]
    fn validate_cli_requires_inputs_unless_listing() {
        with_env_vars(&[], || {
            let cli = Cli::parse_from(["lowerforge"]);
            assert!(validate_cli(&cli).is_err());
            let cli = Cli::parse_from(["lowerforge", "--list-libraries"]);
            let config = validate_cli(&cli).expect("validate cli");
            assert_eq!(config.action, CliAction::ListLibraries);
        });
    }

    #[test]
    fn validate_cli_rejects_class_with_multiple_inputs() {
        with_env_vars(&[], || {
            let cli = Cli::parse_from(["lowerforge", "--class", "X", "a.wat", "b.wat"]);
            let err = validate_cli(&cli).unwrap_err();
            assert!(err.to_string().contains("--class"));
        });
    }

    #[test]
    fn validate_cli_applies_env_defaults_when_cli_not_set() {
        with_env_vars(
            &[
                ("LOWERFORGE_LIBRARY", Some("wasi")),
                ("LOWERFORGE_KEEP_GOING", Some("yes")),
                ("LOWERFORGE_ERROR_FILE", Some("env.log")),
            ],
            || {
                let cli = Cli::parse_from(["lowerforge", "prog.wat"]);
                let config = validate_cli(&cli).expect("validate cli");
                assert_eq!(config.library.as_deref(), Some("wasi"));
                assert_eq!(config.error_policy, ErrorPolicy::Continue);
                assert!(matches!(
                    config.diagnostics_sink,
                    DiagnosticsSinkConfig::File { append: false, .. }
                ));
            },
        );
    }

    #[test]
    fn validate_cli_cli_values_override_env_values() {
        with_env_vars(
            &[("LOWERFORGE_LIBRARY", Some("wasi")), ("LOWERFORGE_NO_WARN", Some("1"))],
            || {
                let cli = Cli::parse_from(["lowerforge", "-L", "ext", "--Werror", "prog.wat"]);
                let config = validate_cli(&cli).expect("validate cli");
                assert_eq!(config.library.as_deref(), Some("ext"));
                assert!(config.warning_policy.emit_warnings);
                assert!(config.warning_policy.treat_warnings_as_errors);
            },
        );
    }

    #[test]
    fn validate_cli_rejects_invalid_env_boolean_value() {
        with_env_vars(&[("LOWERFORGE_WERROR", Some("maybe"))], || {
            let cli = Cli::parse_from(["lowerforge", "prog.wat"]);
            let err = validate_cli(&cli).expect_err("invalid env bool should fail");
            assert!(err
                .to_string()
                .contains("Invalid boolean value for LOWERFORGE_WERROR"));
        });
    }
}
