// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Whole-unit driver: source text in, listing and diagnostics out.

pub mod cli;

use std::fmt;

use serde_json::json;

use crate::core::dyncall::BootstrapCallSite;
use crate::core::emit::Primitive;
use crate::core::engine::{TranslationUnit, UnitConfig};
use crate::core::error::{Diagnostic, ExpandError};
use crate::core::library::{normalize_mnemonic, MacroLibrary, MacroOption};
use crate::core::tracker::LabelRef;

pub const LISTING_SCHEMA: &str = "lowerforge-listing-v1";

/// One meaningful source line: a mnemonic with its operand fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: u32,
    pub mnemonic: String,
    pub operands: Vec<String>,
}

/// Split one line into whitespace-separated fields, dropping `;` comments.
pub fn parse_line(number: u32, text: &str) -> Option<SourceLine> {
    let code = match text.find(';') {
        Some(idx) => &text[..idx],
        None => text,
    };
    let mut fields = code.split_whitespace();
    let mnemonic = fields.next()?.to_string();
    Some(SourceLine {
        number,
        mnemonic,
        operands: fields.map(str::to_string).collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingItem {
    /// A source label definition.
    Label { line: u32, name: String },
    Instruction {
        line: u32,
        mnemonic: String,
        operands: Vec<String>,
        indent: usize,
        primitives: Vec<Primitive>,
    },
    /// A source line that produced no output because it failed.
    Rejected {
        line: u32,
        mnemonic: String,
        operands: Vec<String>,
    },
}

/// Everything produced for one translation unit.
#[derive(Debug, Clone)]
pub struct UnitReport {
    library: String,
    class_name: String,
    indent: bool,
    options: Vec<&'static str>,
    items: Vec<ListingItem>,
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl UnitReport {
    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Names of the options the library was built with.
    pub fn options(&self) -> &[&'static str] {
        &self.options
    }

    pub fn items(&self) -> &[ListingItem] {
        &self.items
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Every primitive of the unit in emission order, source labels included.
    pub fn primitives(&self) -> Vec<Primitive> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                ListingItem::Label { name, .. } => {
                    out.push(Primitive::Label(LabelRef::Named(name.clone())))
                }
                ListingItem::Instruction { primitives, .. } => out.extend(primitives.iter().cloned()),
                ListingItem::Rejected { .. } => {}
            }
        }
        out
    }

    pub fn call_sites(&self) -> Vec<&BootstrapCallSite> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ListingItem::Instruction { primitives, .. } => Some(primitives),
                _ => None,
            })
            .flatten()
            .filter_map(|primitive| match primitive {
                Primitive::DynCall(site) => Some(site),
                _ => None,
            })
            .collect()
    }

    /// Listing as text: each source line, then its primitives one level
    /// deeper. Nesting indentation is applied when the library asks for it.
    pub fn to_text(&self) -> String {
        let mut out = format!("; {} -> {}\n", self.library, self.class_name);
        for item in &self.items {
            match item {
                ListingItem::Label { line, name } => {
                    out.push_str(&format!("{line:>5}  {name}\n"));
                }
                ListingItem::Instruction {
                    line,
                    mnemonic,
                    operands,
                    indent,
                    primitives,
                } => {
                    let pad = if self.indent { "  ".repeat(*indent) } else { String::new() };
                    out.push_str(&format!("{line:>5}  {pad}{}\n", source_text(mnemonic, operands)));
                    for primitive in primitives {
                        out.push_str(&format!("       {pad}    {primitive}\n"));
                    }
                }
                ListingItem::Rejected {
                    line,
                    mnemonic,
                    operands,
                } => {
                    out.push_str(&format!("{line:>5}! {}\n", source_text(mnemonic, operands)));
                }
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let lines: Vec<serde_json::Value> = self
            .items
            .iter()
            .map(|item| match item {
                ListingItem::Label { line, name } => json!({
                    "line": line,
                    "label": name,
                }),
                ListingItem::Instruction {
                    line,
                    mnemonic,
                    operands,
                    indent,
                    primitives,
                } => json!({
                    "line": line,
                    "mnemonic": mnemonic,
                    "operands": operands,
                    "indent": indent,
                    "primitives": primitives.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                }),
                ListingItem::Rejected {
                    line,
                    mnemonic,
                    operands,
                } => json!({
                    "line": line,
                    "mnemonic": mnemonic,
                    "operands": operands,
                    "rejected": true,
                }),
            })
            .collect();
        let call_sites: Vec<serde_json::Value> = self
            .call_sites()
            .into_iter()
            .map(|site| {
                json!({
                    "id": site.id.0,
                    "name": site.name,
                    "descriptor": site.descriptor,
                    "bootstrap": {
                        "owner": site.bootstrap_owner,
                        "method": site.bootstrap_method,
                        "descriptor": site.bootstrap_descriptor,
                    },
                    "static_args": site.static_args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();
        json!({
            "schema": LISTING_SCHEMA,
            "library": self.library,
            "class": self.class_name,
            "options": self.options,
            "lines": lines,
            "call_sites": call_sites,
            "diagnostics": self.diagnostics.iter().map(diagnostic_json).collect::<Vec<_>>(),
            "errors": self.errors,
            "warnings": self.warnings,
        })
    }
}

fn option_names(library: &MacroLibrary) -> Vec<&'static str> {
    library
        .config()
        .options
        .iter()
        .map(|option| option.as_str())
        .collect()
}

fn source_text(mnemonic: &str, operands: &[String]) -> String {
    if operands.is_empty() {
        mnemonic.to_string()
    } else {
        format!("{mnemonic} {}", operands.join(" "))
    }
}

pub fn diagnostic_json(diag: &Diagnostic) -> serde_json::Value {
    json!({
        "code": diag.code(),
        "severity": diag.severity().as_str(),
        "message": diag.message(),
        "line": diag.line(),
        "mnemonic": diag.mnemonic(),
        "notes": diag.notes(),
        "help": diag.help(),
    })
}

/// A unit stopped by the abort-on-error policy.
#[derive(Debug, Clone)]
pub struct TranslateFailure {
    error: ExpandError,
    report: UnitReport,
}

impl TranslateFailure {
    pub fn error(&self) -> &ExpandError {
        &self.error
    }

    /// Output and diagnostics up to and including the failing line.
    pub fn report(&self) -> &UnitReport {
        &self.report
    }
}

impl fmt::Display for TranslateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "translation of {} stopped: {}", self.report.class_name, self.error)
    }
}

impl std::error::Error for TranslateFailure {}

/// Translate a whole unit. End-of-unit checks run even when lines failed;
/// only the abort policy turns the result into an `Err`.
pub fn translate_source(
    library: &MacroLibrary,
    config: UnitConfig,
    text: &str,
) -> Result<UnitReport, TranslateFailure> {
    let class_name = config.class_name.clone();
    let mut unit = TranslationUnit::new(library, config);
    let mut items = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut last_line = 0;

    for (idx, raw) in text.lines().enumerate() {
        let number = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let Some(line) = parse_line(number, raw) else {
            continue;
        };
        last_line = number;
        unit.set_line(number);

        if line.operands.is_empty() && library.is_label(&line.mnemonic) {
            items.push(ListingItem::Label {
                line: number,
                name: line.mnemonic,
            });
            continue;
        }

        let operands: Vec<&str> = line.operands.iter().map(String::as_str).collect();
        let mut primitives: Vec<Primitive> = Vec::new();
        let outcome = unit.translate(
            &line.mnemonic,
            &operands,
            &mut primitives,
            &mut diagnostics,
        );
        match outcome {
            Ok(Some(expansion)) => items.push(ListingItem::Instruction {
                line: number,
                mnemonic: line.mnemonic,
                operands: line.operands,
                indent: expansion.indent,
                primitives,
            }),
            Ok(None) => items.push(ListingItem::Rejected {
                line: number,
                mnemonic: line.mnemonic,
                operands: line.operands,
            }),
            Err(error) => {
                items.push(ListingItem::Rejected {
                    line: number,
                    mnemonic: line.mnemonic,
                    operands: line.operands,
                });
                let report = UnitReport {
                    library: library.name().to_string(),
                    class_name,
                    indent: library.has_option(MacroOption::Indent),
                    options: option_names(library),
                    items,
                    diagnostics,
                    errors: unit.error_count(),
                    warnings: unit.warning_count(),
                };
                return Err(TranslateFailure { error, report });
            }
        }
    }

    unit.set_line(last_line);
    let mut trailing: Vec<Diagnostic> = Vec::new();
    if unit.finish(&mut trailing).is_err() {
        diagnostics.extend(
            trailing
                .into_iter()
                .map(|diag| diag.with_note("construct still open at end of unit")),
        );
    }

    Ok(UnitReport {
        library: library.name().to_string(),
        class_name,
        indent: library.has_option(MacroOption::Indent),
        options: option_names(library),
        items,
        diagnostics,
        errors: unit.error_count(),
        warnings: unit.warning_count(),
    })
}

/// Invocable mnemonics of a library in source spelling, sorted. Entries
/// whose canonical spelling resolves elsewhere are listed by exact name.
pub fn mnemonic_listing(library: &MacroLibrary) -> Vec<String> {
    let mut names: Vec<String> = library
        .external_mnemonics()
        .into_iter()
        .map(|name| {
            let canonical = normalize_mnemonic(name);
            let same_entry = match (library.lookup(&canonical), library.lookup(name)) {
                (Ok((folded, _)), Ok((exact, _))) => folded == exact,
                _ => false,
            };
            if same_entry {
                canonical
            } else {
                name.to_string()
            }
        })
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}
