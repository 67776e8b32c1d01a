// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for lowerforge.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use clap::Parser;

use lowerforge::core::error::{Diagnostic, Severity};
use lowerforge::core::library::MacroLibrary;
use lowerforge::registry_defaults::build_default_registry;
use lowerforge::translator::cli::{
    validate_cli, Cli, CliAction, CliConfig, DiagnosticsSinkConfig, OutputFormat,
};
use lowerforge::translator::{diagnostic_json, mnemonic_listing, translate_source, UnitReport};

struct DiagnosticsSink {
    writer: Option<Box<dyn Write>>,
}

impl DiagnosticsSink {
    fn from_config(config: &DiagnosticsSinkConfig) -> io::Result<Self> {
        match config {
            DiagnosticsSinkConfig::Disabled => Ok(Self { writer: None }),
            DiagnosticsSinkConfig::Stderr => Ok(Self {
                writer: Some(Box::new(io::stderr())),
            }),
            DiagnosticsSinkConfig::File { path, append } => {
                let mut opts = OpenOptions::new();
                opts.create(true).write(true);
                if *append {
                    opts.append(true);
                } else {
                    opts.truncate(true);
                }
                let file = opts.open(path)?;
                Ok(Self {
                    writer: Some(Box::new(file)),
                })
            }
        }
    }

    fn emit_line(&mut self, line: &str) {
        if let Some(writer) = &mut self.writer {
            let _ = writeln!(writer, "{line}");
        }
    }

    fn emit_report_diagnostics(&mut self, path: &Path, report: &UnitReport, config: &CliConfig) {
        for diag in report.diagnostics() {
            if !config.warning_policy.emit_warnings && diag.severity() == Severity::Warning {
                continue;
            }
            self.emit_line(&format_diagnostic_line(diag, path, config.output_format));
        }
    }
}

fn format_diagnostic_line(diag: &Diagnostic, path: &Path, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let mut value = diagnostic_json(diag);
        value["file"] = serde_json::Value::String(path.display().to_string());
        value.to_string()
    } else {
        format!("{}:{}", path.display(), diag.format())
    }
}

fn print_libraries(format: OutputFormat) {
    let registry = build_default_registry();
    if format == OutputFormat::Json {
        let libraries: Vec<serde_json::Value> = registry
            .library_names()
            .into_iter()
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "description": registry.description(name),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(libraries));
    } else {
        for name in registry.library_names() {
            println!("{name:<12} {}", registry.description(name).unwrap_or(""));
        }
    }
}

fn print_mnemonics(library: &MacroLibrary, format: OutputFormat) {
    let names = mnemonic_listing(library);
    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({ "library": library.name(), "mnemonics": names })
        );
    } else {
        for name in names {
            println!("{name}");
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let cli_config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if cli_config.action == CliAction::ListLibraries {
        print_libraries(cli_config.output_format);
        return;
    }

    let registry = build_default_registry();
    let requested = cli_config
        .library
        .clone()
        .or_else(|| registry.library_names().first().map(|name| name.to_string()))
        .unwrap_or_default();
    let library = match registry.get(&requested) {
        Ok(library) => library,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if cli_config.action == CliAction::ListMnemonics {
        print_mnemonics(&library, cli_config.output_format);
        return;
    }

    let mut sink = match DiagnosticsSink::from_config(&cli_config.diagnostics_sink) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("Failed to open diagnostics sink: {err}");
            std::process::exit(1);
        }
    };

    let mut failed = false;
    for path in &cli_config.input_paths {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                sink.emit_line(&format!("{}: {err}", path.display()));
                failed = true;
                continue;
            }
        };
        let (report, stopped) =
            match translate_source(&library, cli_config.unit_config(path), &text) {
                Ok(report) => (report, None),
                Err(failure) => (failure.report().clone(), Some(failure.to_string())),
            };
        match cli_config.output_format {
            OutputFormat::Json => println!("{}", report.to_json()),
            OutputFormat::Text => print!("{}", report.to_text()),
        }
        sink.emit_report_diagnostics(path, &report, &cli_config);
        if let Some(message) = stopped {
            if cli_config.output_format != OutputFormat::Json {
                sink.emit_line(&message);
            }
        }
        failed |= report.has_errors();
    }
    if failed {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_diagnostic_line_json_has_expected_keys_with_nulls() {
        let diag = Diagnostic::new(7, Severity::Error, "boom").with_code("lfe999");
        let line = format_diagnostic_line(&diag, Path::new("prog.wat"), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(value["code"], "lfe999");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["message"], "boom");
        assert_eq!(value["line"], 7);
        assert_eq!(value["file"], "prog.wat");
        assert!(value["mnemonic"].is_null());
        assert!(value["notes"].is_array());
        assert!(value["help"].is_array());
    }

    #[test]
    fn format_diagnostic_line_text_is_prefixed_with_path() {
        let diag = Diagnostic::new(3, Severity::Warning, "ignored").with_mnemonic("FRAME");
        let line = format_diagnostic_line(&diag, Path::new("a.asm"), OutputFormat::Text);
        assert_eq!(line, "a.asm:3: WARNING [lfe000] FRAME - ignored");
    }
}
