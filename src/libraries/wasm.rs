// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! WebAssembly MVP lowering onto the JVM target.
//!
//! Memory, tables and non-trivial arithmetic are delegated to the
//! `wasmrun` runtime classes; everything else maps onto target
//! instructions directly or through the shared helper ops.

use crate::core::descriptor::{OwnerRule, ParmTable};
use crate::core::dyncall::{DynCallSpec, StaticArg, StaticArgSpec};
use crate::core::error::ConfigError;
use crate::core::library::{LibraryBuilder, MacroLibrary, MacroOption};
use crate::core::op::dsl::{
    call, dyncall, emit, insert, insert_method, load_const, local_label, place_label,
    prepend, replace, select12, skip, swap, translate_desc, translate_method,
};
use crate::core::op::{Op, ValueType, Visibility};
use crate::core::registry::LibraryModule;
use crate::libraries::jvm::JVM_ISA;
use crate::libraries::{extended, java_calls};

pub const WASM_LIBRARY_NAME: &str = "wasm32MVP";

const WASM_STORAGE: &str = "wasmrun/Storage";
const WASM_STORAGE_L: &str = "Lwasmrun/Storage;";
const WASM_HELPER: &str = "wasmrun/Helper";
const WASM_TABLE: &str = "wasmrun/Table";
const WASM_TABLE_L: &str = "Lwasmrun/Table;";
const TABLE_PREFIX: &str = "__Table__";
const GS_MEMORY: &str = "GS:__Memory__0()Lwasmrun/Storage;";
const MH_ARRAY_L: &str = "[Ljava/lang/invoke/MethodHandle;";
const STORAGE_BOOT_PARMS: &str = "Ljava/lang/invoke/MethodHandle;I";

/// `(I32,I64)->F64` to `(IJ)D`; `->()` and `->V00` mean no result.
pub static WASM_PARMS: ParmTable = ParmTable {
    arrow: "->",
    void_markers: &["->V00", "->()"],
    separator: ",",
    types: &[("I32", "I"), ("I64", "J"), ("F32", "F"), ("F64", "D")],
};

/// Single-component `wasi*` owners live in the trampoline package.
pub static WASM_OWNERS: &[OwnerRule] = &[OwnerRule::Package {
    prefix: "wasi",
    package: "wasi/trampoline/",
}];

/// Storage access through a call site bound to the module's memory; the
/// operand supplies the memory offset or number.
pub(crate) fn dyn_storage(method: &'static str, desc: &'static str) -> Op {
    dyncall(DynCallSpec::with_boot_parms(
        method,
        Some(desc),
        WASM_STORAGE,
        "storageBootstrap",
        STORAGE_BOOT_PARMS,
        vec![
            StaticArgSpec::Fixed(StaticArg::MethodHandle(GS_MEMORY.to_string())),
            StaticArgSpec::OperandInt,
        ],
    ))
}

fn helper(method: &'static str, desc: &'static str) -> Vec<Op> {
    vec![insert_method(WASM_HELPER, method, desc), emit("invokestatic")]
}

/// Compare-and-select: jump over the swap when the test holds, then drop
/// the value on top.
fn select_on(test: Op) -> Vec<Op> {
    vec![
        local_label(),
        test,
        call("aux_swapnn"),
        local_label(),
        place_label(),
        call("aux_popn"),
    ]
}

static FUSED_IF: &[(&str, &str)] = &[
    ("I32_IFEQZ", "ext_IF_EQZ"),
    ("I32_IFEQ", "ext_IF_ICMPEQ"),
    ("I32_IFNE", "ext_IF_ICMPNE"),
    ("I32_IFLT_S", "ext_IF_ICMPLT"),
    ("I32_IFLT_U", "ext_IF_IUCMPLT"),
    ("I32_IFGT_S", "ext_IF_ICMPGT"),
    ("I32_IFGT_U", "ext_IF_IUCMPGT"),
    ("I32_IFLE_S", "ext_IF_ICMPLE"),
    ("I32_IFLE_U", "ext_IF_IUCMPLE"),
    ("I32_IFGE_S", "ext_IF_ICMPGE"),
    ("I32_IFGE_U", "ext_IF_IUCMPGE"),
    ("I64_IFEQ", "ext_IF_LCMPEQ"),
    ("I64_IFNE", "ext_IF_LCMPNE"),
    ("I64_IFLT_S", "ext_IF_LCMPLT"),
    ("I64_IFLT_U", "ext_IF_LUCMPLT"),
    ("I64_IFGT_S", "ext_IF_LCMPGT"),
    ("I64_IFGT_U", "ext_IF_LUCMPGT"),
    ("I64_IFLE_S", "ext_IF_LCMPLE"),
    ("I64_IFLE_U", "ext_IF_LUCMPLE"),
    ("I64_IFGE_S", "ext_IF_LCMPGE"),
    ("I64_IFGE_U", "ext_IF_LUCMPGE"),
    ("F32_IFEQ", "ext_IF_FCMPEQ"),
    ("F32_IFNE", "ext_IF_FCMPNE"),
    ("F32_IFLT", "ext_IF_FCMPLT"),
    ("F32_IFGT", "ext_IF_FCMPGT"),
    ("F32_IFLE", "ext_IF_FCMPLE"),
    ("F32_IFGE", "ext_IF_FCMPGE"),
    ("F64_IFEQ", "ext_IF_DCMPEQ"),
    ("F64_IFNE", "ext_IF_DCMPNE"),
    ("F64_IFLT", "ext_IF_DCMPLT"),
    ("F64_IFGT", "ext_IF_DCMPGT"),
    ("F64_IFLE", "ext_IF_DCMPLE"),
    ("F64_IFGE", "ext_IF_DCMPGE"),
];

static FUSED_BR_IF: &[(&str, &str)] = &[
    ("I32_BR_IFEQZ", "ext_BR_IFEQZ"),
    ("I32_BR_IFEQ", "ext_BR_IF_ICMPEQ"),
    ("I32_BR_IFNE", "ext_BR_IF_ICMPNE"),
    ("I32_BR_IFLT_S", "ext_BR_IF_ICMPLT"),
    ("I32_BR_IFLT_U", "ext_BR_IF_IUCMPLT"),
    ("I32_BR_IFGT_S", "ext_BR_IF_ICMPGT"),
    ("I32_BR_IFGT_U", "ext_BR_IF_IUCMPGT"),
    ("I32_BR_IFLE_S", "ext_BR_IF_ICMPLE"),
    ("I32_BR_IFLE_U", "ext_BR_IF_IUCMPLE"),
    ("I32_BR_IFGE_S", "ext_BR_IF_ICMPGE"),
    ("I32_BR_IFGE_U", "ext_BR_IF_IUCMPGE"),
    ("I64_BR_IFEQ", "ext_BR_IF_LCMPEQ"),
    ("I64_BR_IFNE", "ext_BR_IF_LCMPNE"),
    ("I64_BR_IFLT_S", "ext_BR_IF_LCMPLT"),
    ("I64_BR_IFLT_U", "ext_BR_IF_LUCMPLT"),
    ("I64_BR_IFGT_S", "ext_BR_IF_LCMPGT"),
    ("I64_BR_IFGT_U", "ext_BR_IF_LUCMPGT"),
    ("I64_BR_IFLE_S", "ext_BR_IF_LCMPLE"),
    ("I64_BR_IFLE_U", "ext_BR_IF_LUCMPLE"),
    ("I64_BR_IFGE_S", "ext_BR_IF_LCMPGE"),
    ("I64_BR_IFGE_U", "ext_BR_IF_LUCMPGE"),
    ("F32_BR_IFEQ", "ext_BR_IF_FCMPEQ"),
    ("F32_BR_IFNE", "ext_BR_IF_FCMPNE"),
    ("F32_BR_IFLT", "ext_BR_IF_FCMPLT"),
    ("F32_BR_IFGT", "ext_BR_IF_FCMPGT"),
    ("F32_BR_IFLE", "ext_BR_IF_FCMPLE"),
    ("F32_BR_IFGE", "ext_BR_IF_FCMPGE"),
    ("F64_BR_IFEQ", "ext_BR_IF_DCMPEQ"),
    ("F64_BR_IFNE", "ext_BR_IF_DCMPNE"),
    ("F64_BR_IFLT", "ext_BR_IF_DCMPLT"),
    ("F64_BR_IFGT", "ext_BR_IF_DCMPGT"),
    ("F64_BR_IFLE", "ext_BR_IF_DCMPLE"),
    ("F64_BR_IFGE", "ext_BR_IF_DCMPGE"),
];

/// Jump used by a compare-and-select entry.
#[derive(Clone, Copy)]
enum SelectTest {
    /// A target instruction with a label operand.
    Native(&'static str),
    /// An extended compare-and-jump op.
    Extended(&'static str),
}

impl SelectTest {
    fn op(self) -> Op {
        match self {
            Self::Native(opcode) => emit(opcode),
            Self::Extended(name) => call(name),
        }
    }
}

use SelectTest::{Extended, Native};

static FUSED_SELECT: &[(&str, SelectTest)] = &[
    ("I32_SELECTEQZ", Native("ifeq")),
    ("I32_SELECTEQ", Native("if_icmpeq")),
    ("I32_SELECTNE", Native("if_icmpne")),
    ("I32_SELECTLT_S", Native("if_icmplt")),
    ("I32_SELECTLT_U", Extended("ext_if_iucmplt")),
    ("I32_SELECTGT_S", Native("if_icmpgt")),
    ("I32_SELECTGT_U", Extended("ext_if_iucmpgt")),
    ("I32_SELECTLE_S", Native("if_icmple")),
    ("I32_SELECTLE_U", Extended("ext_if_iucmple")),
    ("I32_SELECTGE_S", Native("if_icmpge")),
    ("I32_SELECTGE_U", Extended("ext_if_iucmpge")),
    ("I64_SELECTEQ", Extended("ext_if_lcmpeq")),
    ("I64_SELECTNE", Extended("ext_if_lcmpne")),
    ("I64_SELECTLT_S", Extended("ext_if_lcmplt")),
    ("I64_SELECTLT_U", Extended("ext_if_lucmplt")),
    ("I64_SELECTGT_S", Extended("ext_if_lcmpgt")),
    ("I64_SELECTGT_U", Extended("ext_if_lucmpgt")),
    ("I64_SELECTLE_S", Extended("ext_if_lcmple")),
    ("I64_SELECTLE_U", Extended("ext_if_lucmple")),
    ("I64_SELECTGE_S", Extended("ext_if_lcmpge")),
    ("I64_SELECTGE_U", Extended("ext_if_lucmpge")),
    ("F32_SELECTEQ", Extended("ext_if_fcmpeq")),
    ("F32_SELECTNE", Extended("ext_if_fcmpne")),
    ("F32_SELECTLT", Extended("ext_if_fcmplt")),
    ("F32_SELECTGT", Extended("ext_if_fcmpgt")),
    ("F32_SELECTLE", Extended("ext_if_fcmple")),
    ("F32_SELECTGE", Extended("ext_if_fcmpge")),
    ("F64_SELECTEQ", Extended("ext_if_dcmpeq")),
    ("F64_SELECTNE", Extended("ext_if_dcmpne")),
    ("F64_SELECTLT", Extended("ext_if_dcmplt")),
    ("F64_SELECTGT", Extended("ext_if_dcmpgt")),
    ("F64_SELECTLE", Extended("ext_if_dcmple")),
    ("F64_SELECTGE", Extended("ext_if_dcmpge")),
];

/// Target-instruction-only entries: source mnemonic and its lowering.
static DIRECT: &[(&str, &[&str])] = &[
    ("NOP", &["nop"]),
    ("I32_ADD", &["iadd"]),
    ("I32_SUB", &["isub"]),
    ("I32_MUL", &["imul"]),
    ("I32_REM_S", &["irem"]),
    ("I32_AND", &["iand"]),
    ("I32_OR", &["ior"]),
    ("I32_XOR", &["ixor"]),
    ("I32_SHL", &["ishl"]),
    ("I32_SHR_S", &["ishr"]),
    ("I32_SHR_U", &["iushr"]),
    ("I64_ADD", &["ladd"]),
    ("I64_SUB", &["lsub"]),
    ("I64_MUL", &["lmul"]),
    ("I64_REM_S", &["lrem"]),
    ("I64_AND", &["land"]),
    ("I64_OR", &["lor"]),
    ("I64_XOR", &["lxor"]),
    ("I64_SHL", &["l2i", "lshl"]),
    ("I64_SHR_S", &["l2i", "lshr"]),
    ("I64_SHR_U", &["l2i", "lushr"]),
    ("F32_NEG", &["fneg"]),
    ("F32_ADD", &["fadd"]),
    ("F32_SUB", &["fsub"]),
    ("F32_MUL", &["fmul"]),
    ("F32_DIV", &["fdiv"]),
    ("F64_NEG", &["dneg"]),
    ("F64_ADD", &["dadd"]),
    ("F64_SUB", &["dsub"]),
    ("F64_MUL", &["dmul"]),
    ("F64_DIV", &["ddiv"]),
    ("I32_WRAP_I64", &["l2i"]),
    ("I64_EXTEND_S_I32", &["i2l"]),
    ("F32_CONVERT_S_I32", &["i2f"]),
    ("F32_CONVERT_S_I64", &["l2f"]),
    ("F32_DEMOTE_F64", &["d2f"]),
    ("F64_CONVERT_S_I32", &["i2d"]),
    ("F64_CONVERT_S_I64", &["l2d"]),
    ("F64_PROMOTE_F32", &["f2d"]),
];

/// Entries that call runtime helper methods: mnemonic, method, descriptor.
static HELPER_CALLS: &[(&str, &str, &str)] = &[
    ("I32_DIV_S", "intDiv", "(II)I"),
    ("I64_DIV_S", "longDiv", "(JJ)J"),
    ("F32_TRUNC", "truncFloat", "(F)F"),
    ("F64_TRUNC", "truncDouble", "(D)D"),
    ("I32_TRUNC_S_F32", "float2int", "(F)I"),
    ("I32_TRUNC_U_F32", "float2unsignedInt", "(F)I"),
    ("I32_TRUNC_S_F64", "double2int", "(D)I"),
    ("I32_TRUNC_U_F64", "double2unsignedInt", "(D)I"),
    ("I64_TRUNC_S_F32", "float2long", "(F)J"),
    ("I64_TRUNC_U_F32", "float2unsignedLong", "(F)J"),
    ("I64_TRUNC_S_F64", "double2long", "(D)J"),
    ("I64_TRUNC_U_F64", "double2unsignedLong", "(D)J"),
    ("F32_CONVERT_U_I64", "unsignedLong2float", "(J)F"),
    ("F64_CONVERT_U_I64", "unsignedLong2double", "(J)D"),
];

/// Loads and stores: mnemonic, storage method, descriptor. The first
/// operand (alignment) is ignored, the second is the offset.
static MEMORY_ACCESS: &[(&str, &str, &str)] = &[
    ("I32_LOAD", "loadInt", "(I)I"),
    ("I64_LOAD", "loadLong", "(I)J"),
    ("F32_LOAD", "loadFloat", "(I)F"),
    ("F64_LOAD", "loadDouble", "(I)D"),
    ("I32_LOAD8_S", "loadByte", "(I)I"),
    ("I32_LOAD8_U", "loadUByte", "(I)I"),
    ("I32_LOAD16_S", "loadShort", "(I)I"),
    ("I32_LOAD16_U", "loadUShort", "(I)I"),
    ("I64_LOAD8_S", "loadByte2Long", "(I)J"),
    ("I64_LOAD8_U", "loadUByte2Long", "(I)J"),
    ("I64_LOAD16_S", "loadShort2Long", "(I)J"),
    ("I64_LOAD16_U", "loadUShort2Long", "(I)J"),
    ("I64_LOAD32_S", "loadInt2Long", "(I)J"),
    ("I64_LOAD32_U", "loadUInt2Long", "(I)J"),
    ("I32_STORE", "storeInt", "(II)V"),
    ("I64_STORE", "storeLong", "(IJ)V"),
    ("F32_STORE", "storeFloat", "(IF)V"),
    ("F64_STORE", "storeDouble", "(ID)V"),
    ("I32_STORE8", "storeByte", "(II)V"),
    ("I32_STORE16", "storeShort", "(II)V"),
    ("I64_STORE8", "storeLong2Byte", "(IJ)V"),
    ("I64_STORE16", "storeLong2Short", "(IJ)V"),
    ("I64_STORE32", "storeLong2Int", "(IJ)V"),
];

/// Integer comparisons through a platform compare helper: mnemonic,
/// helper op, reduction of the -1/0/1 result.
static HELPER_COMPARES: &[(&str, &str, &str)] = &[
    ("I32_EQ", "inv_icompare", "aux_ieq"),
    ("I32_NE", "inv_icompare", "aux_ine"),
    ("I32_LT_S", "inv_icompare", "aux_ilt"),
    ("I32_LT_U", "inv_iucompare", "aux_ilt"),
    ("I32_GT_S", "inv_icompare", "aux_igt"),
    ("I32_GT_U", "inv_iucompare", "aux_igt"),
    ("I32_LE_S", "inv_icompare", "aux_ile"),
    ("I32_LE_U", "inv_iucompare", "aux_ile"),
    ("I32_GE_S", "inv_icompare", "aux_ige"),
    ("I32_GE_U", "inv_iucompare", "aux_ige"),
    ("I64_LT_U", "inv_lucompare", "aux_ilt"),
    ("I64_GT_U", "inv_lucompare", "aux_igt"),
    ("I64_LE_U", "inv_lucompare", "aux_ile"),
    ("I64_GE_U", "inv_lucompare", "aux_ige"),
];

/// Comparisons through a target compare instruction.
static INSN_COMPARES: &[(&str, &str, &str)] = &[
    ("I64_EQ", "lcmp", "aux_ieq_m101"),
    ("I64_NE", "lcmp", "aux_ine_m101"),
    ("I64_LT_S", "lcmp", "aux_ilt_m101"),
    ("I64_GT_S", "lcmp", "aux_igt_m101"),
    ("I64_LE_S", "lcmp", "aux_ile_m101"),
    ("I64_GE_S", "lcmp", "aux_ige_m101"),
    ("F32_EQ", "fcmpl", "aux_ieq_m101"),
    ("F32_NE", "fcmpl", "aux_ine_m101"),
    ("F32_LT", "fcmpg", "aux_ilt_m101"),
    ("F32_GT", "fcmpl", "aux_igt_m101"),
    ("F32_LE", "fcmpg", "aux_ile_m101"),
    ("F32_GE", "fcmpl", "aux_ige_m101"),
    ("F64_EQ", "dcmpl", "aux_ieq_m101"),
    ("F64_NE", "dcmpl", "aux_ine_m101"),
    ("F64_LT", "dcmpg", "aux_ilt_m101"),
    ("F64_GT", "dcmpl", "aux_igt_m101"),
    ("F64_LE", "dcmpg", "aux_ile_m101"),
    ("F64_GE", "dcmpl", "aux_ige_m101"),
];

fn comparisons(builder: &mut LibraryBuilder) {
    for &(name, compare, reduce) in HELPER_COMPARES {
        builder.external(name, vec![call(compare), call(reduce)]);
    }
    for &(name, compare, reduce) in INSN_COMPARES {
        builder.external(name, vec![emit(compare), call(reduce)]);
    }
    builder.external(
        "I32_EQZ",
        vec![emit("i2l"), emit("lconst_0"), emit("lcmp"), call("aux_ieq_m101")],
    );
    builder.external(
        "I64_EQZ",
        vec![emit("lconst_0"), emit("lcmp"), call("aux_ieq_m101")],
    );
}

/// Stack-arithmetic building blocks shared by the comparison entries.
fn auxiliaries(builder: &mut LibraryBuilder) {
    // sign bit to bit zero
    builder.auxiliary("aux_ilt", vec![emit("iconst_m1"), emit("iushr")]);
    // the *_m101 forms expect -1, 0 or 1 on top
    builder.auxiliary("aux_ine_m101", vec![emit("iconst_1"), emit("iand")]);
    builder.auxiliary(
        "aux_ieq_m101",
        vec![call("aux_ine_m101"), emit("iconst_1"), emit("ixor")],
    );
    builder.auxiliary("aux_ilt_m101", vec![call("aux_ilt")]);
    builder.auxiliary(
        "aux_ile_m101",
        vec![emit("iconst_1"), emit("isub"), call("aux_ilt")],
    );
    builder.auxiliary(
        "aux_igt_m101",
        vec![
            emit("iconst_1"),
            emit("iadd"),
            emit("iconst_1"),
            emit("iushr"),
        ],
    );
    builder.auxiliary("aux_ige_m101", vec![emit("ineg"), call("aux_ile_m101")]);
    builder.auxiliary("aux_ine", vec![call("ext_isignum"), call("aux_ine_m101")]);
    builder.auxiliary("aux_ieq", vec![call("ext_isignum"), call("aux_ieq_m101")]);
    builder.auxiliary(
        "aux_ile",
        vec![emit("i2l"), emit("lconst_1"), emit("lcmp"), call("aux_ilt")],
    );
    builder.auxiliary(
        "aux_igt",
        vec![
            emit("i2l"),
            emit("lneg"),
            emit("iconst_m1"),
            emit("lushr"),
            emit("l2i"),
        ],
    );
    builder.auxiliary(
        "aux_ige",
        vec![call("aux_ilt"), emit("iconst_1"), emit("ixor")],
    );

    builder.auxiliary("aux_popn", vec![select12(emit("pop"), emit("pop2"))]);
    builder.auxiliary("aux_dupn", vec![select12(emit("dup"), emit("dup2"))]);
    builder.auxiliary(
        "aux_dupn_xn",
        vec![select12(emit("dup_x1"), emit("dup2_x2"))],
    );
    builder.auxiliary("aux_swapnn", vec![call("aux_dupn_xn"), call("aux_popn")]);

    builder.auxiliary("aux_fstd_NaN", helper("arithmeticFloatNaN", "(F)F"));
    builder.auxiliary("aux_dstd_NaN", helper("arithmeticDoubleNaN", "(D)D"));
    builder.auxiliary(
        "aux_newtable",
        vec![
            insert_method(WASM_TABLE, "getInstance", "()Lwasmrun/Table;"),
            emit("invokestatic"),
        ],
    );
    builder.auxiliary(
        "aux_newmem",
        vec![
            insert_method(WASM_STORAGE, "getInstance", "(II)Lwasmrun/Storage;"),
            emit("invokestatic"),
        ],
    );
}

fn control_ops(builder: &mut LibraryBuilder) {
    let mut unreachable = helper("unreachable", "()Ljava/lang/AssertionError;");
    unreachable.push(emit("athrow"));
    builder.external("UNREACHABLE", unreachable);
    builder.external("BLOCK", vec![call("ext_BLOCK")]).opens();
    builder.external("LOOP", vec![call("ext_LOOP")]).opens();
    builder.external("IF", vec![call("ext_IF_NEZ")]).opens();
    builder.external("ELSE", vec![call("ext_ELSE")]).reopens();
    builder.external("END", vec![call("ext_END")]).closes();
    builder.external("BR", vec![call("ext_BR")]);
    builder.external("BR_IF", vec![call("ext_BR_IFNEZ")]);
    builder.external("BR_TABLE", vec![call("ext_BR_TABLE")]);
    builder.external("RETURN", vec![call("ext_RETURN")]);
    builder.external("CALL", vec![translate_method(), emit("invokestatic")]);
    builder.external(
        "CALL_INDIRECT",
        vec![
            prepend(TABLE_PREFIX),
            insert(WASM_TABLE_L),
            swap(),
            emit("getstatic"),
            emit("swap"),
            insert_method(
                WASM_TABLE,
                "getMH",
                "(I)Ljava/lang/invoke/MethodHandle;",
            ),
            emit("invokevirtual"),
            translate_desc(),
            replace("I)", "Ljava/lang/invoke/MethodHandle;)"),
            dyncall(DynCallSpec::of(
                "invokeExact",
                None,
                WASM_TABLE,
                "callIndirectBootstrapMH",
            )),
        ],
    );
}

fn parametric_ops(builder: &mut LibraryBuilder) {
    builder.external("DROP", vec![call("aux_popn")]);
    builder.external("SELECT", select_on(emit("ifne")));
    builder.external(
        "UNWIND",
        vec![dyncall(DynCallSpec::of(
            "unwind",
            None,
            WASM_HELPER,
            "unwindBootstrap",
        ))],
    );
    builder.external("LOCAL_GET", vec![call("xxx_xload")]);
    builder.external("LOCAL_SET", vec![call("xxx_xstore")]);
    builder.external("LOCAL_TEE", vec![call("aux_dupn"), call("xxx_xstore")]);

    for value_type in ValueType::ALL {
        let (get, set) = match value_type {
            ValueType::I32 => ("I32_GLOBAL_GET", "I32_GLOBAL_SET"),
            ValueType::I64 => ("I64_GLOBAL_GET", "I64_GLOBAL_SET"),
            ValueType::F32 => ("F32_GLOBAL_GET", "F32_GLOBAL_SET"),
            ValueType::F64 => ("F64_GLOBAL_GET", "F64_GLOBAL_SET"),
        };
        let desc = value_type.descriptor();
        builder
            .external(get, vec![insert(desc), swap(), emit("getstatic")])
            .typed(value_type);
        builder
            .external(set, vec![insert(desc), swap(), emit("putstatic")])
            .typed(value_type);
    }
}

fn memory_ops(builder: &mut LibraryBuilder) {
    for &(name, method, desc) in MEMORY_ACCESS {
        builder.external(name, vec![skip(), dyn_storage(method, desc)]);
    }
    builder.external("MEMORY_SIZE", vec![dyn_storage("currentPages", "()I")]);
    builder.external("MEMORY_GROW", vec![dyn_storage("grow", "(I)I")]);
}

fn numeric_ops(builder: &mut LibraryBuilder) {
    builder.external("I32_CONST", vec![load_const(ValueType::I32)]);
    builder.external("I64_CONST", vec![load_const(ValueType::I64)]);
    builder.external("F32_CONST", vec![load_const(ValueType::F32)]);
    builder.external("F64_CONST", vec![load_const(ValueType::F64)]);

    for &(name, opcodes) in DIRECT {
        builder.external(name, opcodes.iter().map(|&opcode| emit(opcode)).collect());
    }
    for &(name, method, desc) in HELPER_CALLS {
        builder.external(name, helper(method, desc));
    }

    builder.external("I32_CLZ", vec![call("inv_iclz")]);
    builder.external("I32_CTZ", vec![call("inv_ictz")]);
    builder.external("I32_POPCNT", vec![call("inv_ipopct")]);
    builder.external("I32_DIV_U", vec![call("inv_iudiv")]);
    builder.external("I32_REM_U", vec![call("inv_iurem")]);
    builder.external("I32_ROTL", vec![call("inv_irotl")]);
    builder.external("I32_ROTR", vec![call("inv_irotr")]);

    builder.external("I64_CLZ", vec![call("inv_lclz"), emit("i2l")]);
    builder.external("I64_CTZ", vec![call("inv_lctz"), emit("i2l")]);
    builder.external("I64_POPCNT", vec![call("inv_lpopct"), emit("i2l")]);
    builder.external("I64_DIV_U", vec![call("inv_ludiv")]);
    builder.external("I64_REM_U", vec![call("inv_lurem")]);
    builder.external("I64_ROTL", vec![emit("l2i"), call("inv_lrotl")]);
    builder.external("I64_ROTR", vec![emit("l2i"), call("inv_lrotr")]);

    builder.external("F32_ABS", vec![call("inv_fabs")]);
    builder.external("F32_CEIL", vec![emit("f2d"), call("inv_dceil"), emit("d2f")]);
    builder.external("F32_FLOOR", vec![emit("f2d"), call("inv_dfloor"), emit("d2f")]);
    builder.external("F32_NEAREST", vec![emit("f2d"), call("inv_drint"), emit("d2f")]);
    builder.external("F32_SQRT", vec![emit("f2d"), call("inv_dsqrt"), emit("d2f")]);
    builder.external("F32_MIN", vec![call("inv_fmin"), call("aux_fstd_NaN")]);
    builder.external("F32_MAX", vec![call("inv_fmax"), call("aux_fstd_NaN")]);
    builder.external("F32_COPYSIGN", vec![call("inv_fcopysign")]);

    builder.external("F64_ABS", vec![call("inv_dabs")]);
    builder.external("F64_CEIL", vec![call("inv_dceil"), call("aux_dstd_NaN")]);
    builder.external("F64_FLOOR", vec![call("inv_dfloor"), call("aux_dstd_NaN")]);
    builder.external("F64_NEAREST", vec![call("inv_drint")]);
    builder.external("F64_SQRT", vec![call("inv_dsqrt")]);
    builder.external("F64_MIN", vec![call("inv_dmin"), call("aux_dstd_NaN")]);
    builder.external("F64_MAX", vec![call("inv_dmax"), call("aux_dstd_NaN")]);
    builder.external("F64_COPYSIGN", vec![call("inv_dcopysign")]);

    builder.external("I64_EXTEND_U_I32", vec![call("inv_iu2l")]);
    builder.external("F32_CONVERT_U_I32", vec![call("inv_iu2l"), emit("l2f")]);
    builder.external("F64_CONVERT_U_I32", vec![call("inv_iu2l"), emit("l2d")]);

    builder.external("I32_REINTERPRET_F32", vec![call("inv_fasi")]);
    builder.external("I64_REINTERPRET_F64", vec![call("inv_dasl")]);
    builder.external("F32_REINTERPRET_I32", vec![call("inv_iasf")]);
    builder.external("F64_REINTERPRET_I64", vec![call("inv_lasd")]);
}

fn fused_ops(builder: &mut LibraryBuilder) {
    for &(name, target) in FUSED_IF {
        builder.external(name, vec![call(target)]).opens();
    }
    builder
        .external("I64_IFEQZ", vec![emit("lconst_0"), call("ext_IF_LCMPEQ")])
        .opens();

    for &(name, target) in FUSED_BR_IF {
        builder.external(name, vec![call(target)]);
    }
    builder.external(
        "I64_BR_IFEQZ",
        vec![emit("lconst_0"), call("ext_BR_IF_LCMPEQ")],
    );

    for &(name, test) in FUSED_SELECT {
        builder.external(name, select_on(test.op()));
    }
    let mut select_eqz = vec![emit("lconst_0")];
    select_eqz.extend(select_on(call("ext_if_lcmpeq")));
    builder.external("I64_SELECTEQZ", select_eqz);
}

fn module_init_ops(builder: &mut LibraryBuilder) {
    builder.external(
        "MEMORY_NEW",
        vec![emit("ldc"), emit("ldc"), call("aux_newmem")],
    );
    builder.external(
        "MEMORY_CHECK",
        vec![
            emit("ldc"),
            emit("ldc"),
            dyn_storage("checkInstance", "(II)Lwasmrun/Storage;"),
        ],
    );
    builder.external(
        "ADD_SEGMENT",
        vec![
            emit("ldc"),
            swap(),
            emit("ldc"),
            dyn_storage("putBase64String", "(ILjava/lang/String;)V"),
        ],
    );
    builder.external(
        "COPY_MEMORY",
        vec![
            insert(WASM_STORAGE_L),
            swap(),
            emit("getstatic"),
            insert(WASM_STORAGE_L),
            swap(),
            emit("putstatic"),
        ],
    );
    builder.external(
        "MEMORY_GLOBAL_GET",
        vec![insert(WASM_STORAGE_L), swap(), emit("getstatic")],
    );
    builder.external(
        "MEMORY_GLOBAL_SET",
        vec![insert(WASM_STORAGE_L), swap(), emit("putstatic")],
    );
    builder.external("TABLE_NEW", vec![call("aux_newtable")]);
    builder.external(
        "COPY_TABLE",
        vec![
            insert(WASM_TABLE_L),
            swap(),
            emit("getstatic"),
            insert(WASM_TABLE_L),
            swap(),
            emit("putstatic"),
        ],
    );
    builder.external(
        "ADD_ENTRY",
        vec![
            load_const(ValueType::I32),
            dyncall(DynCallSpec::with_boot_parms(
                "mharray",
                Some("()[Ljava/lang/invoke/MethodHandle;"),
                WASM_TABLE,
                "constantArrayBootstrap",
                MH_ARRAY_L,
                vec![StaticArgSpec::OperandHandles],
            )),
            insert_method(
                WASM_TABLE,
                "add",
                "(I[Ljava/lang/invoke/MethodHandle;)Lwasmrun/Table;",
            ),
            emit("invokevirtual"),
        ],
    );
    builder.external(
        "TABLE_TEE",
        vec![
            emit("dup"),
            prepend(TABLE_PREFIX),
            insert(WASM_TABLE_L),
            swap(),
            emit("putstatic"),
        ],
    );
}

/// Register the full wasm table, helper entries included, on `builder`.
pub fn register(builder: &mut LibraryBuilder) {
    builder
        .set_parms(WASM_PARMS)
        .set_owners(WASM_OWNERS)
        .enable(MacroOption::StructuredLabels)
        .enable(MacroOption::UnsignedLong)
        .enable(MacroOption::Indent);

    java_calls::register(builder, Visibility::Auxiliary);
    extended::register(builder, Visibility::Auxiliary);
    extended::register_select(builder, Visibility::Auxiliary);
    auxiliaries(builder);

    control_ops(builder);
    parametric_ops(builder);
    memory_ops(builder);
    numeric_ops(builder);
    comparisons(builder);
    fused_ops(builder);
    module_init_ops(builder);
}

pub fn build_wasm_library() -> Result<MacroLibrary, ConfigError> {
    let mut builder = LibraryBuilder::new(WASM_LIBRARY_NAME, &JVM_ISA);
    register(&mut builder);
    builder.build()
}

pub struct WasmLibrary;

impl LibraryModule for WasmLibrary {
    fn library_name(&self) -> &'static str {
        WASM_LIBRARY_NAME
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["wasm", "wasm32"]
    }

    fn description(&self) -> &'static str {
        "WebAssembly MVP instructions lowered onto the JVM with the wasmrun runtime"
    }

    fn build(&self) -> Result<MacroLibrary, ConfigError> {
        build_wasm_library()
    }
}
