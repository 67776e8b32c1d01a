// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instructions in ASM textifier syntax.
//!
//! Every target instruction is available under its own name. Lookup
//! normalizes to upper case, so textifier spellings (`IADD`) resolve to
//! them. A few instructions print their operands differently and are
//! overridden below.

use crate::core::error::ConfigError;
use crate::core::library::{LabelSyntax, LibraryBuilder, MacroLibrary};
use crate::core::op::dsl::{
    check, check_not, emit, ignored, join, lower, remove_prefix, skip, skip_all, swap, unsupported,
};
use crate::core::registry::LibraryModule;
use crate::libraries::jvm::{JVM_INSTRUCTION_TABLE, JVM_ISA};

pub const ASM_TEXT_LIBRARY_NAME: &str = "ASMTextOps";

/// Target instructions replaced by an override entry, plus the line
/// number pseudo-instruction, which has a textifier form of its own.
const OVERRIDDEN: &[&str] = &[
    "ldc",
    "invokedynamic",
    "lookupswitch",
    "tableswitch",
    "getfield",
    "getstatic",
    "putfield",
    "putstatic",
    "invokeinterface",
    "invokespecial",
    "invokestatic",
    "invokevirtual",
    "newarray",
    ".line",
];

fn overrides(builder: &mut LibraryBuilder) {
    builder.external(
        "LDC",
        vec![unsupported(
            "Jynx ldc used instead but different format if not int or double",
        )],
    );
    builder.external(
        "INVOKEDYNAMIC",
        vec![unsupported("use Jynx invokedynamic instead as different format")],
    );
    builder.external(
        "LOOKUPSWITCH",
        vec![unsupported("use Jynx lookupswitch instead as different format")],
    );
    builder.external(
        "TABLESWITCH",
        vec![unsupported("use Jynx tableswitch instead as different format")],
    );

    builder.external("FRAME", vec![ignored("stack map can be calculated"), skip_all()]);
    builder.external(
        "MAXSTACK",
        vec![ignored("maxstack can be calculated"), check("="), skip()],
    );
    builder.external(
        "MAXLOCALS",
        vec![ignored("maxlocal can be calculated"), check("="), skip()],
    );

    // `owner.name : desc`
    for (name, opcode) in [
        ("GETFIELD", "getfield"),
        ("GETSTATIC", "getstatic"),
        ("PUTFIELD", "putfield"),
        ("PUTSTATIC", "putstatic"),
    ] {
        builder.external(name, vec![swap(), check(":"), emit(opcode)]);
    }

    // `owner.name desc`
    for (name, opcode) in [
        ("INVOKEINTERFACE", "invokeinterface"),
        ("INVOKESPECIAL", "invokespecial"),
        ("INVOKEVIRTUAL", "invokevirtual"),
    ] {
        builder.external(name, vec![join(""), emit(opcode)]);
    }
    builder.external(
        "INVOKESTATIC",
        vec![check_not("{itf}"), join(""), emit("invokestatic")],
    );

    builder.external("LINENUMBER", vec![emit(".line"), skip()]);
    builder.external(
        "NEWARRAY",
        vec![remove_prefix("T_"), lower(), emit("newarray")],
    );
}

pub fn build_asm_text_library() -> Result<MacroLibrary, ConfigError> {
    let mut builder = LibraryBuilder::new(ASM_TEXT_LIBRARY_NAME, &JVM_ISA);
    builder.set_label_syntax(LabelSyntax::PrefixedDigits('L'));
    for insn in JVM_INSTRUCTION_TABLE {
        if !OVERRIDDEN.contains(&insn.name) {
            builder.external(insn.name, vec![emit(insn.name)]);
        }
    }
    overrides(&mut builder);
    builder.build()
}

pub struct AsmTextLibrary;

impl LibraryModule for AsmTextLibrary {
    fn library_name(&self) -> &'static str {
        ASM_TEXT_LIBRARY_NAME
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["asm", "asmtext"]
    }

    fn description(&self) -> &'static str {
        "JVM instructions as printed by the ASM textifier"
    }

    fn build(&self) -> Result<MacroLibrary, ConfigError> {
        build_asm_text_library()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExpandErrorKind;

    #[test]
    fn textifier_spelling_resolves() {
        let library = build_asm_text_library().expect("asm library");
        let (upper, _) = library.lookup("IADD").expect("IADD");
        let (lower, _) = library.lookup("iadd").expect("iadd");
        assert_eq!(upper, lower);
        assert!(library.is_label("L12"));
        assert!(!library.is_label("L"));
        assert!(!library.is_label("start"));
    }

    #[test]
    fn every_target_instruction_is_reachable() {
        let library = build_asm_text_library().expect("asm library");
        for insn in JVM_INSTRUCTION_TABLE {
            if insn.name == ".line" {
                continue;
            }
            assert!(library.lookup(&insn.name.to_ascii_uppercase()).is_ok(), "{}", insn.name);
        }
    }

    #[test]
    fn unknown_textifier_op_is_reported() {
        let library = build_asm_text_library().expect("asm library");
        let err = library.lookup("FOO").unwrap_err();
        assert_eq!(err.kind(), ExpandErrorKind::UnknownMnemonic);
    }
}
