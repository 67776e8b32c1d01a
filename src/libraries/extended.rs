// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Structured control, compare-and-jump and stack-select ops.
//!
//! Families are tabled per condition class; each table lists the six
//! comparisons in `Compare::ALL` order.

use crate::core::library::LibraryBuilder;
use crate::core::op::dsl::{control, emit, emit_typed, jump_if, select12};
use crate::core::op::{Compare, Condition, ControlKind, Visibility};

macro_rules! compare_names {
    ($prefix:literal) => {
        [
            concat!($prefix, "EQ"),
            concat!($prefix, "NE"),
            concat!($prefix, "LT"),
            concat!($prefix, "GT"),
            concat!($prefix, "LE"),
            concat!($prefix, "GE"),
        ]
    };
    (lower $prefix:literal) => {
        [
            concat!($prefix, "eq"),
            concat!($prefix, "ne"),
            concat!($prefix, "lt"),
            concat!($prefix, "gt"),
            concat!($prefix, "le"),
            concat!($prefix, "ge"),
        ]
    };
}

type Family = ([&'static str; 6], fn(Compare) -> Condition);

static IF_FAMILIES: [Family; 6] = [
    (compare_names!("ext_IF_ICMP"), Condition::Int),
    (compare_names!("ext_IF_IUCMP"), Condition::UnsignedInt),
    (compare_names!("ext_IF_LCMP"), Condition::Long),
    (compare_names!("ext_IF_LUCMP"), Condition::UnsignedLong),
    (compare_names!("ext_IF_FCMP"), Condition::Float),
    (compare_names!("ext_IF_DCMP"), Condition::Double),
];

static BR_IF_FAMILIES: [Family; 6] = [
    (compare_names!("ext_BR_IF_ICMP"), Condition::Int),
    (compare_names!("ext_BR_IF_IUCMP"), Condition::UnsignedInt),
    (compare_names!("ext_BR_IF_LCMP"), Condition::Long),
    (compare_names!("ext_BR_IF_LUCMP"), Condition::UnsignedLong),
    (compare_names!("ext_BR_IF_FCMP"), Condition::Float),
    (compare_names!("ext_BR_IF_DCMP"), Condition::Double),
];

/// Label-operand jumps for the compares the target has no single
/// instruction for.
static JUMP_FAMILIES: [Family; 5] = [
    (compare_names!(lower "ext_if_iucmp"), Condition::UnsignedInt),
    (compare_names!(lower "ext_if_lcmp"), Condition::Long),
    (compare_names!(lower "ext_if_lucmp"), Condition::UnsignedLong),
    (compare_names!(lower "ext_if_fcmp"), Condition::Float),
    (compare_names!(lower "ext_if_dcmp"), Condition::Double),
];

/// Add the extended ops to `builder`.
pub fn register(builder: &mut LibraryBuilder, visibility: Visibility) {
    builder
        .define("ext_BLOCK", visibility, vec![control(ControlKind::Block)])
        .opens();
    builder
        .define("ext_LOOP", visibility, vec![control(ControlKind::Loop)])
        .opens();
    builder
        .define(
            "ext_IF_NEZ",
            visibility,
            vec![control(ControlKind::If(Condition::NonZero))],
        )
        .opens();
    builder
        .define(
            "ext_IF_EQZ",
            visibility,
            vec![control(ControlKind::If(Condition::Zero))],
        )
        .opens();
    builder
        .define("ext_ELSE", visibility, vec![control(ControlKind::Else)])
        .reopens();
    builder
        .define("ext_END", visibility, vec![control(ControlKind::End)])
        .closes();
    builder.define("ext_BR", visibility, vec![control(ControlKind::Branch)]);
    builder.define(
        "ext_BR_IFNEZ",
        visibility,
        vec![control(ControlKind::BranchIf(Condition::NonZero))],
    );
    builder.define(
        "ext_BR_IFEQZ",
        visibility,
        vec![control(ControlKind::BranchIf(Condition::Zero))],
    );
    builder.define(
        "ext_BR_TABLE",
        visibility,
        vec![control(ControlKind::BranchTable)],
    );
    builder.define("ext_RETURN", visibility, vec![control(ControlKind::Return)]);

    for (names, condition) in &IF_FAMILIES {
        for (&name, cmp) in names.iter().zip(Compare::ALL) {
            builder
                .define(name, visibility, vec![control(ControlKind::If(condition(cmp)))])
                .opens();
        }
    }
    for (names, condition) in &BR_IF_FAMILIES {
        for (&name, cmp) in names.iter().zip(Compare::ALL) {
            builder.define(
                name,
                visibility,
                vec![control(ControlKind::BranchIf(condition(cmp)))],
            );
        }
    }
    for (names, condition) in &JUMP_FAMILIES {
        for (&name, cmp) in names.iter().zip(Compare::ALL) {
            builder.define(name, visibility, vec![jump_if(condition(cmp))]);
        }
    }
}

/// Add the width- and type-selecting stack ops to `builder`.
pub fn register_select(builder: &mut LibraryBuilder, visibility: Visibility) {
    builder.define(
        "xxx_xload",
        visibility,
        vec![emit_typed(["iload", "lload", "fload", "dload"])],
    );
    builder.define(
        "xxx_xstore",
        visibility,
        vec![emit_typed(["istore", "lstore", "fstore", "dstore"])],
    );
    builder.define(
        "xxx_xreturn",
        visibility,
        vec![emit_typed(["ireturn", "lreturn", "freturn", "dreturn"])],
    );
    builder.define(
        "xxx_popn",
        visibility,
        vec![select12(emit("pop"), emit("pop2"))],
    );
    builder.define(
        "xxx_dupn",
        visibility,
        vec![select12(emit("dup"), emit("dup2"))],
    );
    builder.define(
        "xxx_dupn_xn",
        visibility,
        vec![select12(emit("dup_x1"), emit("dup2_x2"))],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_tables_follow_compare_order() {
        assert_eq!(IF_FAMILIES[0].0[2], "ext_IF_ICMPLT");
        assert_eq!(BR_IF_FAMILIES[3].0[5], "ext_BR_IF_LUCMPGE");
        assert_eq!(JUMP_FAMILIES[0].0[0], "ext_if_iucmpeq");
        assert_eq!((JUMP_FAMILIES[4].1)(Compare::ALL[3]), Condition::Double(Compare::Gt));
    }
}
