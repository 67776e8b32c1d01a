// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Op data model shared by every macro library.
//!
//! Ops are plain data. Libraries compose them into named entries and the
//! expansion engine interprets them; no op carries behaviour of its own.

use crate::core::dyncall::DynCallSpec;

/// Index of an entry inside one macro library.
pub type EntryId = usize;

/// Source value category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

/// Number of target stack slots a value occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWidth {
    Single,
    Double,
}

impl ValueType {
    pub const ALL: [ValueType; 4] = [Self::I32, Self::I64, Self::F32, Self::F64];

    pub fn source_name(self) -> &'static str {
        match self {
            Self::I32 => "I32",
            Self::I64 => "I64",
            Self::F32 => "F32",
            Self::F64 => "F64",
        }
    }

    /// Target descriptor code.
    pub fn descriptor(self) -> &'static str {
        match self {
            Self::I32 => "I",
            Self::I64 => "J",
            Self::F32 => "F",
            Self::F64 => "D",
        }
    }

    pub fn width(self) -> SlotWidth {
        match self {
            Self::I32 | Self::F32 => SlotWidth::Single,
            Self::I64 | Self::F64 => SlotWidth::Double,
        }
    }

    /// Position in per-type opcode tables (I32, I64, F32, F64).
    pub fn index(self) -> usize {
        match self {
            Self::I32 => 0,
            Self::I64 => 1,
            Self::F32 => 2,
            Self::F64 => 3,
        }
    }

    /// Parse a type annotation field in source or target spelling.
    pub fn parse_annotation(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "I32" | "I" => Some(Self::I32),
            "I64" | "J" => Some(Self::I64),
            "F32" | "F" => Some(Self::F32),
            "F64" | "D" => Some(Self::F64),
            _ => None,
        }
    }
}

/// Whether source text may invoke an entry directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    External,
    Auxiliary,
}

/// Listing indentation role of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentRole {
    #[default]
    None,
    Begin,
    Else,
    End,
}

impl IndentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Begin => "begin",
            Self::Else => "else",
            Self::End => "end",
        }
    }
}

/// Relational test between two operands, or an operand and zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Compare {
    pub const ALL: [Compare; 6] = [
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Ge,
    ];

    pub fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Ge => "GE",
        }
    }
}

/// Branch condition over the value(s) on top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    NonZero,
    Zero,
    Int(Compare),
    UnsignedInt(Compare),
    Long(Compare),
    UnsignedLong(Compare),
    Float(Compare),
    Double(Compare),
}

impl Condition {
    pub fn negate(self) -> Self {
        match self {
            Self::NonZero => Self::Zero,
            Self::Zero => Self::NonZero,
            Self::Int(c) => Self::Int(c.negate()),
            Self::UnsignedInt(c) => Self::UnsignedInt(c.negate()),
            Self::Long(c) => Self::Long(c.negate()),
            Self::UnsignedLong(c) => Self::UnsignedLong(c.negate()),
            Self::Float(c) => Self::Float(c.negate()),
            Self::Double(c) => Self::Double(c.negate()),
        }
    }
}

/// Structured control construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Block,
    Loop,
    If(Condition),
    Else,
    End,
    Branch,
    BranchIf(Condition),
    BranchTable,
    Return,
}

impl ControlKind {
    pub fn indent_role(self) -> IndentRole {
        match self {
            Self::Block | Self::Loop | Self::If(_) => IndentRole::Begin,
            Self::Else => IndentRole::Else,
            Self::End => IndentRole::End,
            _ => IndentRole::None,
        }
    }
}

/// Primitive operand-text transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Swap,
    Insert(&'static str),
    InsertMethod {
        owner: &'static str,
        name: &'static str,
        desc: &'static str,
    },
    InsertTypeDescriptor,
    Join(&'static str),
    Replace {
        from: &'static str,
        to: &'static str,
    },
    RemovePrefix(&'static str),
    Surround {
        prefix: &'static str,
        suffix: &'static str,
    },
    Lower,
    Upper,
    Skip,
    SkipAll,
    TranslateDescriptor,
    TranslateMethod,
}

/// Precondition on the operand text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Next field equals the token; it is consumed.
    Expect(&'static str),
    /// No remaining field equals the token.
    Reject(&'static str),
    /// First field contains the substring.
    Contains(&'static str),
}

/// Message attached to an entry that exists but is not translated normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Aborts the instruction; the text names the substitute form.
    Unsupported(&'static str),
    /// Warns and continues.
    Ignored(&'static str),
}

/// Reference from one entry to another, resolved when the library is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroRef {
    pub name: &'static str,
    pub target: Option<EntryId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Emit(&'static str),
    /// One target opcode per value type (I32, I64, F32, F64).
    EmitByType([&'static str; 4]),
    LoadConst(ValueType),
    Rewrite(Transform),
    Assert(Check),
    Diagnose(Notice),
    DynCall(DynCallSpec),
    Select {
        single: Vec<Op>,
        double: Vec<Op>,
    },
    Control(ControlKind),
    /// Conditional jump to a label taken from the operand text.
    JumpIf(Condition),
    LocalLabel,
    PlaceLabel,
    Call(MacroRef),
    Seq(Vec<Op>),
}

/// Short constructors used by the library tables.
pub mod dsl {
    use super::*;

    pub fn emit(opcode: &'static str) -> Op {
        Op::Emit(opcode)
    }

    pub fn emit_typed(opcodes: [&'static str; 4]) -> Op {
        Op::EmitByType(opcodes)
    }

    pub fn load_const(value_type: ValueType) -> Op {
        Op::LoadConst(value_type)
    }

    pub fn call(name: &'static str) -> Op {
        Op::Call(MacroRef { name, target: None })
    }

    pub fn seq(ops: Vec<Op>) -> Op {
        Op::Seq(ops)
    }

    pub fn swap() -> Op {
        Op::Rewrite(Transform::Swap)
    }

    pub fn insert(literal: &'static str) -> Op {
        Op::Rewrite(Transform::Insert(literal))
    }

    pub fn insert_method(owner: &'static str, name: &'static str, desc: &'static str) -> Op {
        Op::Rewrite(Transform::InsertMethod { owner, name, desc })
    }

    pub fn insert_type_descriptor() -> Op {
        Op::Rewrite(Transform::InsertTypeDescriptor)
    }

    pub fn join(separator: &'static str) -> Op {
        Op::Rewrite(Transform::Join(separator))
    }

    pub fn replace(from: &'static str, to: &'static str) -> Op {
        Op::Rewrite(Transform::Replace { from, to })
    }

    pub fn remove_prefix(prefix: &'static str) -> Op {
        Op::Rewrite(Transform::RemovePrefix(prefix))
    }

    pub fn prepend(prefix: &'static str) -> Op {
        Op::Rewrite(Transform::Surround { prefix, suffix: "" })
    }

    pub fn surround(prefix: &'static str, suffix: &'static str) -> Op {
        Op::Rewrite(Transform::Surround { prefix, suffix })
    }

    pub fn lower() -> Op {
        Op::Rewrite(Transform::Lower)
    }

    pub fn upper() -> Op {
        Op::Rewrite(Transform::Upper)
    }

    pub fn skip() -> Op {
        Op::Rewrite(Transform::Skip)
    }

    pub fn skip_all() -> Op {
        Op::Rewrite(Transform::SkipAll)
    }

    pub fn translate_desc() -> Op {
        Op::Rewrite(Transform::TranslateDescriptor)
    }

    pub fn translate_method() -> Op {
        Op::Rewrite(Transform::TranslateMethod)
    }

    pub fn check(token: &'static str) -> Op {
        Op::Assert(Check::Expect(token))
    }

    pub fn check_not(token: &'static str) -> Op {
        Op::Assert(Check::Reject(token))
    }

    pub fn contains(substring: &'static str) -> Op {
        Op::Assert(Check::Contains(substring))
    }

    pub fn unsupported(hint: &'static str) -> Op {
        Op::Diagnose(Notice::Unsupported(hint))
    }

    pub fn ignored(reason: &'static str) -> Op {
        Op::Diagnose(Notice::Ignored(reason))
    }

    pub fn dyncall(spec: DynCallSpec) -> Op {
        Op::DynCall(spec)
    }

    pub fn select12(single: Op, double: Op) -> Op {
        Op::Select {
            single: vec![single],
            double: vec![double],
        }
    }

    pub fn control(kind: ControlKind) -> Op {
        Op::Control(kind)
    }

    pub fn jump_if(condition: Condition) -> Op {
        Op::JumpIf(condition)
    }

    pub fn local_label() -> Op {
        Op::LocalLabel
    }

    pub fn place_label() -> Op {
        Op::PlaceLabel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_annotations_accept_both_spellings() {
        assert_eq!(ValueType::parse_annotation("i64"), Some(ValueType::I64));
        assert_eq!(ValueType::parse_annotation("J"), Some(ValueType::I64));
        assert_eq!(ValueType::parse_annotation("F64"), Some(ValueType::F64));
        assert_eq!(ValueType::parse_annotation("0"), None);
    }

    #[test]
    fn double_negation_is_identity() {
        for cmp in Compare::ALL {
            assert_eq!(cmp.negate().negate(), cmp);
            let cond = Condition::Float(cmp);
            assert_eq!(cond.negate().negate(), cond);
        }
        assert_eq!(Condition::Zero.negate(), Condition::NonZero);
    }

    #[test]
    fn openers_begin_indentation() {
        assert_eq!(ControlKind::Loop.indent_role(), IndentRole::Begin);
        assert_eq!(
            ControlKind::If(Condition::NonZero).indent_role(),
            IndentRole::Begin
        );
        assert_eq!(ControlKind::Else.indent_role(), IndentRole::Else);
        assert_eq!(
            ControlKind::BranchIf(Condition::Zero).indent_role(),
            IndentRole::None
        );
    }
}
