// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Target instruction set description consumed by the expansion engine.
//!
//! The engine knows nothing about a concrete target. A target supplies its
//! instruction table (name plus operand form) and the small set of lowering
//! hooks needed for structured control, constants and returns.

use crate::core::op::{Condition, ValueType};

/// Operand fields an instruction consumes from the operand text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    None,
    One,
    Two,
    Label,
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInsn {
    pub name: &'static str,
    pub form: OperandForm,
}

/// One instruction of a condition prelude: opcode plus optional operand.
pub type PreludeInsn = (&'static str, Option<&'static str>);

/// How one condition is tested: zero or more prelude instructions followed
/// by a conditional jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionLowering {
    pub prelude: &'static [PreludeInsn],
    pub jump: &'static str,
}

/// Chosen constant-load instruction and its rendered operand, if any.
pub type ConstLoad = (&'static str, Option<String>);

pub struct TargetIsa {
    pub name: &'static str,
    pub instructions: &'static [TargetInsn],
    pub goto: &'static str,
    pub table_switch: &'static str,
    pub void_return: &'static str,
    pub typed_return: [&'static str; 4],
    /// Lower a condition, or its inverse when the flag is set. The prelude
    /// is chosen from the condition as written so float compares keep
    /// their NaN ordering under inversion.
    pub lower_condition: fn(Condition, bool) -> ConditionLowering,
    /// Parse a literal and pick the load form; the flag admits unsigned
    /// 64-bit literals.
    pub load_const: fn(ValueType, &str, bool) -> Result<ConstLoad, String>,
}

impl TargetIsa {
    pub fn lookup(&self, name: &str) -> Option<&TargetInsn> {
        self.instructions.iter().find(|insn| insn.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

impl std::fmt::Debug for TargetIsa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetIsa")
            .field("name", &self.name)
            .field("instructions", &self.instructions.len())
            .finish()
    }
}
