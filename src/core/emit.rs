// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Primitive emissions and the sinks that receive them.

use std::fmt;

use crate::core::dyncall::BootstrapCallSite;
use crate::core::error::Diagnostic;
use crate::core::tracker::LabelRef;

/// One irreducible target action handed to the low-level assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    Insn {
        opcode: &'static str,
        operands: Vec<String>,
    },
    Jump {
        opcode: &'static str,
        target: LabelRef,
    },
    /// Label definition at the current position.
    Label(LabelRef),
    TableSwitch {
        opcode: &'static str,
        low: i32,
        default: LabelRef,
        targets: Vec<LabelRef>,
    },
    DynCall(BootstrapCallSite),
}

impl Primitive {
    pub fn insn(opcode: &'static str) -> Self {
        Self::Insn {
            opcode,
            operands: Vec::new(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insn { opcode, operands } => {
                write!(f, "{opcode}")?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                Ok(())
            }
            Self::Jump { opcode, target } => write!(f, "{opcode} {target}"),
            Self::Label(label) => write!(f, "{label}:"),
            Self::TableSwitch {
                opcode,
                low,
                default,
                targets,
            } => {
                write!(f, "{opcode} {low} [")?;
                for (idx, target) in targets.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{target}")?;
                }
                write!(f, "] default {default}")
            }
            Self::DynCall(site) => write!(f, "{site}"),
        }
    }
}

/// Receiver of primitive emissions, in expansion order.
///
/// A sink may refuse a primitive; the refusal becomes a `SinkRejected`
/// failure of the instruction being translated.
pub trait EmissionSink {
    fn emit(&mut self, primitive: &Primitive) -> Result<(), String>;
}

impl EmissionSink for Vec<Primitive> {
    fn emit(&mut self, primitive: &Primitive) -> Result<(), String> {
        self.push(primitive.clone());
        Ok(())
    }
}

/// Receiver of diagnostics produced while translating a unit.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::Label;

    #[test]
    fn renders_listing_forms() {
        let insn = Primitive::Insn {
            opcode: "getstatic",
            operands: vec!["__Table__0".to_string(), "Lwasmrun/Table;".to_string()],
        };
        assert_eq!(insn.to_string(), "getstatic __Table__0 Lwasmrun/Table;");
        let jump = Primitive::Jump {
            opcode: "ifeq",
            target: LabelRef::Generated(Label(3)),
        };
        assert_eq!(jump.to_string(), "ifeq @L3");
        assert_eq!(
            Primitive::Label(LabelRef::Named("L7".to_string())).to_string(),
            "L7:"
        );
        let switch = Primitive::TableSwitch {
            opcode: "tableswitch",
            low: 0,
            default: LabelRef::Generated(Label(0)),
            targets: vec![LabelRef::Generated(Label(1)), LabelRef::Generated(Label(0))],
        };
        assert_eq!(switch.to_string(), "tableswitch 0 [@L1 @L0] default @L0");
    }
}
