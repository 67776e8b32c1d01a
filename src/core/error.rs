// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types and diagnostics for macro expansion and library loading.

use std::fmt;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Categories of per-instruction expansion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandErrorKind {
    UnknownMnemonic,
    NotInvocable,
    UnsupportedOperation,
    MalformedOperand,
    AssertionFailed,
    InvalidBranchDepth,
    UnbalancedControlConstruct,
    SinkRejected,
}

impl ExpandErrorKind {
    /// Default severity used when the failure is reported as a diagnostic.
    ///
    /// Unsupported operations stay visible without stopping translation.
    pub fn default_severity(self) -> Severity {
        match self {
            Self::UnsupportedOperation => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A failed expansion of one source instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandError {
    kind: ExpandErrorKind,
    mnemonic: Option<String>,
    message: String,
}

impl ExpandError {
    pub fn new(kind: ExpandErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            mnemonic: None,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ExpandErrorKind::MalformedOperand, message)
    }

    pub fn unbalanced(message: impl Into<String>) -> Self {
        Self::new(ExpandErrorKind::UnbalancedControlConstruct, message)
    }

    /// Attach the offending mnemonic unless an inner frame already did.
    pub fn with_mnemonic(mut self, mnemonic: &str) -> Self {
        if self.mnemonic.is_none() {
            self.mnemonic = Some(mnemonic.to_string());
        }
        self
    }

    pub fn kind(&self) -> ExpandErrorKind {
        self.kind
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mnemonic {
            Some(mnemonic) => write!(f, "{mnemonic}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ExpandError {}

/// A macro library table that cannot be used. Detected once, at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    DuplicateMnemonic {
        library: String,
        mnemonic: String,
    },
    UnknownReference {
        library: String,
        entry: String,
        target: String,
    },
    Cycle {
        library: String,
        path: Vec<String>,
    },
    UnknownTargetOp {
        library: String,
        entry: String,
        opcode: String,
    },
    DescriptorTemplate {
        library: String,
        entry: String,
        template: String,
    },
    BootstrapArity {
        library: String,
        entry: String,
        message: String,
    },
    IndentRole {
        library: String,
        entry: String,
        declared: String,
        derived: String,
    },
    NoExternalEntries {
        library: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMnemonic { library, mnemonic } => {
                write!(f, "library '{library}': mnemonic '{mnemonic}' defined twice")
            }
            Self::UnknownReference {
                library,
                entry,
                target,
            } => write!(
                f,
                "library '{library}': entry '{entry}' references unknown macro '{target}'"
            ),
            Self::Cycle { library, path } => write!(
                f,
                "library '{library}': cyclic macro reference {}",
                path.join(" -> ")
            ),
            Self::UnknownTargetOp {
                library,
                entry,
                opcode,
            } => write!(
                f,
                "library '{library}': entry '{entry}' emits unknown target instruction '{opcode}'"
            ),
            Self::DescriptorTemplate {
                library,
                entry,
                template,
            } => write!(
                f,
                "library '{library}': entry '{entry}' has unsatisfiable descriptor template '{template}'"
            ),
            Self::BootstrapArity {
                library,
                entry,
                message,
            } => write!(
                f,
                "library '{library}': entry '{entry}' bootstrap arguments invalid: {message}"
            ),
            Self::IndentRole {
                library,
                entry,
                declared,
                derived,
            } => write!(
                f,
                "library '{library}': entry '{entry}' declares indent role {declared} but its control ops imply {derived}"
            ),
            Self::NoExternalEntries { library } => {
                write!(f, "library '{library}' has no invocable mnemonics")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A diagnostic produced while translating one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    line: u32,
    mnemonic: Option<String>,
    code: String,
    severity: Severity,
    message: String,
    notes: Vec<String>,
    help: Vec<String>,
}

impl Diagnostic {
    pub fn new(line: u32, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            line,
            mnemonic: None,
            code: "lfe000".to_string(),
            severity,
            message: message.into(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Exactly one diagnostic per failed instruction.
    pub fn from_expand_error(line: u32, err: &ExpandError) -> Self {
        let mut diag = Self::new(line, err.severity(), err.message())
            .with_code(default_diagnostic_code(err.kind()));
        diag.mnemonic = err.mnemonic().map(str::to_string);
        if err.kind() == ExpandErrorKind::UnsupportedOperation {
            diag = diag.with_help(err.message().to_string());
        }
        diag
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = Some(mnemonic.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    pub fn format(&self) -> String {
        let sev = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        match &self.mnemonic {
            Some(mnemonic) => format!(
                "{}: {} [{}] {} - {}",
                self.line, sev, self.code, mnemonic, self.message
            ),
            None => format!("{}: {} [{}] - {}", self.line, sev, self.code, self.message),
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn help(&self) -> &[String] {
        &self.help
    }
}

pub fn default_diagnostic_code(kind: ExpandErrorKind) -> &'static str {
    match kind {
        ExpandErrorKind::UnknownMnemonic => "lfe001",
        ExpandErrorKind::NotInvocable => "lfe002",
        ExpandErrorKind::UnsupportedOperation => "lfe003",
        ExpandErrorKind::MalformedOperand => "lfe004",
        ExpandErrorKind::AssertionFailed => "lfe005",
        ExpandErrorKind::InvalidBranchDepth => "lfe006",
        ExpandErrorKind::UnbalancedControlConstruct => "lfe007",
        ExpandErrorKind::SinkRejected => "lfe008",
    }
}

/// Code used for notices from ops that are accepted but ignored.
pub const IGNORED_OP_CODE: &str = "lfw001";
