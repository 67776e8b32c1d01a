// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! JVM-style target instruction set shared by every shipped library.

use crate::core::op::{Compare, Condition, ValueType};
use crate::core::target::{ConditionLowering, ConstLoad, OperandForm, PreludeInsn, TargetInsn, TargetIsa};
use crate::core::tokens::{parse_int, parse_magnitude};

use OperandForm::{Label, None as Bare, One, Rest, Two};

const fn insn(name: &'static str, form: OperandForm) -> TargetInsn {
    TargetInsn { name, form }
}

pub static JVM_INSTRUCTION_TABLE: &[TargetInsn] = &[
    insn("nop", Bare),
    insn("aconst_null", Bare),
    insn("iconst_m1", Bare),
    insn("iconst_0", Bare),
    insn("iconst_1", Bare),
    insn("iconst_2", Bare),
    insn("iconst_3", Bare),
    insn("iconst_4", Bare),
    insn("iconst_5", Bare),
    insn("lconst_0", Bare),
    insn("lconst_1", Bare),
    insn("fconst_0", Bare),
    insn("fconst_1", Bare),
    insn("fconst_2", Bare),
    insn("dconst_0", Bare),
    insn("dconst_1", Bare),
    insn("bipush", One),
    insn("sipush", One),
    insn("ldc", One),
    insn("ldc_w", One),
    insn("ldc2_w", One),
    insn("iload", One),
    insn("lload", One),
    insn("fload", One),
    insn("dload", One),
    insn("aload", One),
    insn("iaload", Bare),
    insn("laload", Bare),
    insn("faload", Bare),
    insn("daload", Bare),
    insn("aaload", Bare),
    insn("baload", Bare),
    insn("caload", Bare),
    insn("saload", Bare),
    insn("istore", One),
    insn("lstore", One),
    insn("fstore", One),
    insn("dstore", One),
    insn("astore", One),
    insn("iastore", Bare),
    insn("lastore", Bare),
    insn("fastore", Bare),
    insn("dastore", Bare),
    insn("aastore", Bare),
    insn("bastore", Bare),
    insn("castore", Bare),
    insn("sastore", Bare),
    insn("pop", Bare),
    insn("pop2", Bare),
    insn("dup", Bare),
    insn("dup_x1", Bare),
    insn("dup_x2", Bare),
    insn("dup2", Bare),
    insn("dup2_x1", Bare),
    insn("dup2_x2", Bare),
    insn("swap", Bare),
    insn("iadd", Bare),
    insn("ladd", Bare),
    insn("fadd", Bare),
    insn("dadd", Bare),
    insn("isub", Bare),
    insn("lsub", Bare),
    insn("fsub", Bare),
    insn("dsub", Bare),
    insn("imul", Bare),
    insn("lmul", Bare),
    insn("fmul", Bare),
    insn("dmul", Bare),
    insn("idiv", Bare),
    insn("ldiv", Bare),
    insn("fdiv", Bare),
    insn("ddiv", Bare),
    insn("irem", Bare),
    insn("lrem", Bare),
    insn("frem", Bare),
    insn("drem", Bare),
    insn("ineg", Bare),
    insn("lneg", Bare),
    insn("fneg", Bare),
    insn("dneg", Bare),
    insn("ishl", Bare),
    insn("lshl", Bare),
    insn("ishr", Bare),
    insn("lshr", Bare),
    insn("iushr", Bare),
    insn("lushr", Bare),
    insn("iand", Bare),
    insn("land", Bare),
    insn("ior", Bare),
    insn("lor", Bare),
    insn("ixor", Bare),
    insn("lxor", Bare),
    insn("iinc", Two),
    insn("i2l", Bare),
    insn("i2f", Bare),
    insn("i2d", Bare),
    insn("l2i", Bare),
    insn("l2f", Bare),
    insn("l2d", Bare),
    insn("f2i", Bare),
    insn("f2l", Bare),
    insn("f2d", Bare),
    insn("d2i", Bare),
    insn("d2l", Bare),
    insn("d2f", Bare),
    insn("i2b", Bare),
    insn("i2c", Bare),
    insn("i2s", Bare),
    insn("lcmp", Bare),
    insn("fcmpl", Bare),
    insn("fcmpg", Bare),
    insn("dcmpl", Bare),
    insn("dcmpg", Bare),
    insn("ifeq", Label),
    insn("ifne", Label),
    insn("iflt", Label),
    insn("ifge", Label),
    insn("ifgt", Label),
    insn("ifle", Label),
    insn("if_icmpeq", Label),
    insn("if_icmpne", Label),
    insn("if_icmplt", Label),
    insn("if_icmpge", Label),
    insn("if_icmpgt", Label),
    insn("if_icmple", Label),
    insn("if_acmpeq", Label),
    insn("if_acmpne", Label),
    insn("goto", Label),
    insn("jsr", Label),
    insn("ret", One),
    insn("tableswitch", Rest),
    insn("lookupswitch", Rest),
    insn("ireturn", Bare),
    insn("lreturn", Bare),
    insn("freturn", Bare),
    insn("dreturn", Bare),
    insn("areturn", Bare),
    insn("return", Bare),
    insn("getstatic", Two),
    insn("putstatic", Two),
    insn("getfield", Two),
    insn("putfield", Two),
    insn("invokevirtual", One),
    insn("invokespecial", One),
    insn("invokestatic", One),
    insn("invokeinterface", One),
    insn("invokedynamic", Rest),
    insn("new", One),
    insn("newarray", One),
    insn("anewarray", One),
    insn("arraylength", Bare),
    insn("athrow", Bare),
    insn("checkcast", One),
    insn("instanceof", One),
    insn("monitorenter", Bare),
    insn("monitorexit", Bare),
    insn("multianewarray", Two),
    insn("ifnull", Label),
    insn("ifnonnull", Label),
    insn("goto_w", Label),
    insn("jsr_w", Label),
    insn(".line", One),
];

pub static JVM_ISA: TargetIsa = TargetIsa {
    name: "jvm",
    instructions: JVM_INSTRUCTION_TABLE,
    goto: "goto",
    table_switch: "tableswitch",
    void_return: "return",
    typed_return: ["ireturn", "lreturn", "freturn", "dreturn"],
    lower_condition,
    load_const,
};

const INT_COMPARE_UNSIGNED: &[PreludeInsn] =
    &[("invokestatic", Some("java/lang/Integer/compareUnsigned(II)I"))];
const LONG_COMPARE_UNSIGNED: &[PreludeInsn] =
    &[("invokestatic", Some("java/lang/Long/compareUnsigned(JJ)I"))];

fn zero_jump(cmp: Compare) -> &'static str {
    match cmp {
        Compare::Eq => "ifeq",
        Compare::Ne => "ifne",
        Compare::Lt => "iflt",
        Compare::Gt => "ifgt",
        Compare::Le => "ifle",
        Compare::Ge => "ifge",
    }
}

fn int_jump(cmp: Compare) -> &'static str {
    match cmp {
        Compare::Eq => "if_icmpeq",
        Compare::Ne => "if_icmpne",
        Compare::Lt => "if_icmplt",
        Compare::Gt => "if_icmpgt",
        Compare::Le => "if_icmple",
        Compare::Ge => "if_icmpge",
    }
}

/// Float compares use the `g` variant for LT/LE so an unordered result
/// never satisfies the test as written.
fn lower_condition(condition: Condition, negate: bool) -> ConditionLowering {
    let prelude: &'static [PreludeInsn] = match condition {
        Condition::NonZero | Condition::Zero | Condition::Int(_) => &[],
        Condition::UnsignedInt(_) => INT_COMPARE_UNSIGNED,
        Condition::Long(_) => &[("lcmp", None)],
        Condition::UnsignedLong(_) => LONG_COMPARE_UNSIGNED,
        Condition::Float(Compare::Lt | Compare::Le) => &[("fcmpg", None)],
        Condition::Float(_) => &[("fcmpl", None)],
        Condition::Double(Compare::Lt | Compare::Le) => &[("dcmpg", None)],
        Condition::Double(_) => &[("dcmpl", None)],
    };
    let tested = if negate { condition.negate() } else { condition };
    let jump = match tested {
        Condition::NonZero => "ifne",
        Condition::Zero => "ifeq",
        Condition::Int(cmp) => int_jump(cmp),
        Condition::UnsignedInt(cmp)
        | Condition::Long(cmp)
        | Condition::UnsignedLong(cmp)
        | Condition::Float(cmp)
        | Condition::Double(cmp) => zero_jump(cmp),
    };
    ConditionLowering { prelude, jump }
}

fn load_const(value_type: ValueType, text: &str, unsigned_long: bool) -> Result<ConstLoad, String> {
    match value_type {
        ValueType::I32 => {
            let wide = parse_int(text).ok_or_else(|| format!("'{text}' is not an integer"))?;
            if wide < i64::from(i32::MIN) || wide > i64::from(u32::MAX) {
                return Err(format!("'{text}' does not fit in 32 bits"));
            }
            let value = wide as u32 as i32;
            Ok(match value {
                -1 => ("iconst_m1", None),
                0 => ("iconst_0", None),
                1 => ("iconst_1", None),
                2 => ("iconst_2", None),
                3 => ("iconst_3", None),
                4 => ("iconst_4", None),
                5 => ("iconst_5", None),
                v if i8::try_from(v).is_ok() => ("bipush", Some(v.to_string())),
                v if i16::try_from(v).is_ok() => ("sipush", Some(v.to_string())),
                v => ("ldc", Some(v.to_string())),
            })
        }
        ValueType::I64 => {
            let digits = text.strip_suffix(['L', 'l']).unwrap_or(text);
            let (negative, magnitude) =
                parse_magnitude(digits).ok_or_else(|| format!("'{text}' is not a 64-bit integer"))?;
            let value = if negative {
                if magnitude > 1 << 63 {
                    return Err(format!("'{text}' does not fit in 64 bits"));
                }
                (magnitude as i64).wrapping_neg()
            } else if magnitude > i64::MAX as u64 {
                if !unsigned_long {
                    return Err(format!(
                        "'{text}' is an unsigned 64-bit literal; the library does not accept them"
                    ));
                }
                magnitude as i64
            } else {
                magnitude as i64
            };
            Ok(match value {
                0 => ("lconst_0", None),
                1 => ("lconst_1", None),
                v => ("ldc2_w", Some(format!("{v}L"))),
            })
        }
        ValueType::F32 => {
            let value = parse_f32(text).ok_or_else(|| format!("'{text}' is not a float literal"))?;
            let bits = value.to_bits();
            Ok(if bits == 0.0f32.to_bits() {
                ("fconst_0", None)
            } else if bits == 1.0f32.to_bits() {
                ("fconst_1", None)
            } else if bits == 2.0f32.to_bits() {
                ("fconst_2", None)
            } else if value.is_finite() {
                ("ldc", Some(format!("{value:?}F")))
            } else {
                ("ldc", Some(non_finite_text(value.is_nan(), value.is_sign_negative())))
            })
        }
        ValueType::F64 => {
            let value = parse_f64(text).ok_or_else(|| format!("'{text}' is not a double literal"))?;
            let bits = value.to_bits();
            Ok(if bits == 0.0f64.to_bits() {
                ("dconst_0", None)
            } else if bits == 1.0f64.to_bits() {
                ("dconst_1", None)
            } else if value.is_finite() {
                ("ldc2_w", Some(format!("{value:?}")))
            } else {
                ("ldc2_w", Some(non_finite_text(value.is_nan(), value.is_sign_negative())))
            })
        }
    }
}

fn non_finite_text(nan: bool, negative: bool) -> String {
    match (nan, negative) {
        (true, _) => "NaN",
        (false, false) => "Infinity",
        (false, true) => "-Infinity",
    }
    .to_string()
}

fn parse_f32(text: &str) -> Option<f32> {
    if let Some(value) = parse_hex_float(text) {
        return Some(value as f32);
    }
    text.parse()
        .ok()
        .or_else(|| text.strip_suffix(['F', 'f'])?.parse().ok())
}

fn parse_f64(text: &str) -> Option<f64> {
    if let Some(value) = parse_hex_float(text) {
        return Some(value);
    }
    text.parse()
        .ok()
        .or_else(|| text.strip_suffix(['D', 'd'])?.parse().ok())
}

/// `0x1.8p3` style literal. Digits past 60 significant bits are dropped.
fn parse_hex_float(text: &str) -> Option<f64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let hex = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"))?;
    let (mantissa_text, mut exponent) = match hex.find(['p', 'P']) {
        Some(at) => (&hex[..at], hex[at + 1..].parse::<i32>().ok()?),
        None => (hex, 0),
    };
    let (whole, fraction) = mantissa_text.split_once('.').unwrap_or((mantissa_text, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let mut mantissa: u64 = 0;
    for c in whole.chars() {
        let digit = c.to_digit(16)?;
        if mantissa >> 60 == 0 {
            mantissa = mantissa << 4 | u64::from(digit);
        } else {
            exponent = exponent.saturating_add(4);
        }
    }
    for c in fraction.chars() {
        let digit = c.to_digit(16)?;
        if mantissa >> 60 == 0 {
            mantissa = mantissa << 4 | u64::from(digit);
            exponent = exponent.saturating_sub(4);
        }
    }
    let mut value = mantissa as f64;
    while exponent != 0 && value != 0.0 && value.is_finite() {
        let step = exponent.clamp(-1000, 1000);
        value *= 2f64.powi(step);
        exponent -= step;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_unique_names() {
        let mut names: Vec<&str> = JVM_INSTRUCTION_TABLE.iter().map(|i| i.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
        assert_eq!(JVM_ISA.lookup("getstatic").map(|i| i.form), Some(OperandForm::Two));
        assert!(!JVM_ISA.has("i32.add"));
    }

    #[test]
    fn int_constants_pick_shortest_form() {
        let load = |text: &str| load_const(ValueType::I32, text, false).expect("const");
        assert_eq!(load("0"), ("iconst_0", None));
        assert_eq!(load("-1"), ("iconst_m1", None));
        assert_eq!(load("100"), ("bipush", Some("100".to_string())));
        assert_eq!(load("-300"), ("sipush", Some("-300".to_string())));
        assert_eq!(load("70000"), ("ldc", Some("70000".to_string())));
        assert_eq!(load("0xFFFFFFFF"), ("iconst_m1", None));
        assert!(load_const(ValueType::I32, "0x100000000", false).is_err());
    }

    #[test]
    fn unsigned_long_literals_need_the_option() {
        assert!(load_const(ValueType::I64, "18446744073709551615", false).is_err());
        assert_eq!(
            load_const(ValueType::I64, "18446744073709551615", true),
            Ok(("ldc2_w", Some("-1L".to_string())))
        );
        assert_eq!(load_const(ValueType::I64, "1", false), Ok(("lconst_1", None)));
        assert_eq!(
            load_const(ValueType::I64, "0x8000000000000000", true),
            Ok(("ldc2_w", Some("-9223372036854775808L".to_string())))
        );
        assert_eq!(
            load_const(ValueType::I64, "0xFFFFFFFFFFFFFFFF", true),
            Ok(("ldc2_w", Some("-1L".to_string())))
        );
        assert!(load_const(ValueType::I64, "0x8000000000000000", false).is_err());
    }

    #[test]
    fn long_constants_cover_the_signed_range() {
        assert_eq!(
            load_const(ValueType::I64, "-9223372036854775808", false),
            Ok(("ldc2_w", Some("-9223372036854775808L".to_string())))
        );
        assert_eq!(
            load_const(ValueType::I64, "-0x10", false),
            Ok(("ldc2_w", Some("-16L".to_string())))
        );
        assert!(load_const(ValueType::I64, "-9223372036854775809", true).is_err());
        assert!(load_const(ValueType::I64, "12abc", true).is_err());
    }

    #[test]
    fn float_constants() {
        assert_eq!(load_const(ValueType::F32, "2.0", false), Ok(("fconst_2", None)));
        assert_eq!(
            load_const(ValueType::F32, "-0.0", false),
            Ok(("ldc", Some("-0.0F".to_string())))
        );
        assert_eq!(
            load_const(ValueType::F64, "0.5", false),
            Ok(("ldc2_w", Some("0.5".to_string())))
        );
        assert_eq!(
            load_const(ValueType::F32, "1.5f", false),
            Ok(("ldc", Some("1.5F".to_string())))
        );
    }

    #[test]
    fn non_finite_floats_use_java_spelling() {
        let ldc = |value_type, text| load_const(value_type, text, false).expect(text).1;
        assert_eq!(ldc(ValueType::F32, "Infinity"), Some("Infinity".to_string()));
        assert_eq!(ldc(ValueType::F32, "inf"), Some("Infinity".to_string()));
        assert_eq!(ldc(ValueType::F32, "nan"), Some("NaN".to_string()));
        assert_eq!(ldc(ValueType::F64, "-inf"), Some("-Infinity".to_string()));
        assert_eq!(ldc(ValueType::F64, "NaN"), Some("NaN".to_string()));
    }

    #[test]
    fn hex_float_literals() {
        assert_eq!(
            load_const(ValueType::F32, "0x1p-1", false),
            Ok(("ldc", Some("0.5F".to_string())))
        );
        assert_eq!(load_const(ValueType::F32, "0x1p1", false), Ok(("fconst_2", None)));
        assert_eq!(
            load_const(ValueType::F64, "-0x1.8p3", false),
            Ok(("ldc2_w", Some("-12.0".to_string())))
        );
        assert_eq!(
            load_const(ValueType::F64, "0x1f", false),
            Ok(("ldc2_w", Some("31.0".to_string())))
        );
        assert_eq!(parse_hex_float("0x1p-1074"), Some(f64::from_bits(1)));
        assert_eq!(parse_hex_float("0x.p1"), None);
        assert_eq!(parse_hex_float("1.5"), None);
    }

    #[test]
    fn inverted_float_compare_keeps_nan_ordering() {
        let lt = lower_condition(Condition::Float(Compare::Lt), false);
        assert_eq!(lt.prelude, &[("fcmpg", None)]);
        assert_eq!(lt.jump, "iflt");
        let not_lt = lower_condition(Condition::Float(Compare::Lt), true);
        assert_eq!(not_lt.prelude, &[("fcmpg", None)]);
        assert_eq!(not_lt.jump, "ifge");
        let gt = lower_condition(Condition::Double(Compare::Gt), true);
        assert_eq!(gt.prelude, &[("dcmpl", None)]);
        assert_eq!(gt.jump, "ifle");
    }

    #[test]
    fn unsigned_int_compare_goes_through_helper() {
        let lowering = lower_condition(Condition::UnsignedInt(Compare::Ge), false);
        assert_eq!(lowering.prelude, INT_COMPARE_UNSIGNED);
        assert_eq!(lowering.jump, "ifge");
        assert_eq!(lower_condition(Condition::Int(Compare::Eq), true).jump, "if_icmpne");
        assert_eq!(lower_condition(Condition::NonZero, true).jump, "ifeq");
    }
}
