// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Helper ops that call static methods of the Java platform classes.

use crate::core::library::LibraryBuilder;
use crate::core::op::dsl::{emit, insert_method};
use crate::core::op::Visibility;

const INTEGER: &str = "java/lang/Integer";
const LONG: &str = "java/lang/Long";
const FLOAT: &str = "java/lang/Float";
const DOUBLE: &str = "java/lang/Double";
const MATH: &str = "java/lang/Math";

/// A helper call: op name, owner class, method name and descriptor.
pub struct JavaCall {
    pub name: &'static str,
    pub owner: &'static str,
    pub method: &'static str,
    pub desc: &'static str,
}

const fn call(
    name: &'static str,
    owner: &'static str,
    method: &'static str,
    desc: &'static str,
) -> JavaCall {
    JavaCall {
        name,
        owner,
        method,
        desc,
    }
}

pub static JAVA_CALL_TABLE: &[JavaCall] = &[
    call("inv_icompare", INTEGER, "compare", "(II)I"),
    call("inv_iucompare", INTEGER, "compareUnsigned", "(II)I"),
    call("inv_lcompare", LONG, "compare", "(JJ)I"),
    call("inv_lucompare", LONG, "compareUnsigned", "(JJ)I"),
    call("inv_iclz", INTEGER, "numberOfLeadingZeros", "(I)I"),
    call("inv_ictz", INTEGER, "numberOfTrailingZeros", "(I)I"),
    call("inv_ipopct", INTEGER, "bitCount", "(I)I"),
    call("inv_iudiv", INTEGER, "divideUnsigned", "(II)I"),
    call("inv_iurem", INTEGER, "remainderUnsigned", "(II)I"),
    call("inv_irotl", INTEGER, "rotateLeft", "(II)I"),
    call("inv_irotr", INTEGER, "rotateRight", "(II)I"),
    call("inv_iu2l", INTEGER, "toUnsignedLong", "(I)J"),
    call("inv_lclz", LONG, "numberOfLeadingZeros", "(J)I"),
    call("inv_lctz", LONG, "numberOfTrailingZeros", "(J)I"),
    call("inv_lpopct", LONG, "bitCount", "(J)I"),
    call("inv_ludiv", LONG, "divideUnsigned", "(JJ)J"),
    call("inv_lurem", LONG, "remainderUnsigned", "(JJ)J"),
    call("inv_lrotl", LONG, "rotateLeft", "(JI)J"),
    call("inv_lrotr", LONG, "rotateRight", "(JI)J"),
    call("inv_fabs", MATH, "abs", "(F)F"),
    call("inv_fmin", MATH, "min", "(FF)F"),
    call("inv_fmax", MATH, "max", "(FF)F"),
    call("inv_fcopysign", MATH, "copySign", "(FF)F"),
    call("inv_dabs", MATH, "abs", "(D)D"),
    call("inv_dceil", MATH, "ceil", "(D)D"),
    call("inv_dfloor", MATH, "floor", "(D)D"),
    call("inv_drint", MATH, "rint", "(D)D"),
    call("inv_dsqrt", MATH, "sqrt", "(D)D"),
    call("inv_dmin", MATH, "min", "(DD)D"),
    call("inv_dmax", MATH, "max", "(DD)D"),
    call("inv_dcopysign", MATH, "copySign", "(DD)D"),
    call("inv_fasi", FLOAT, "floatToRawIntBits", "(F)I"),
    call("inv_iasf", FLOAT, "intBitsToFloat", "(I)F"),
    call("inv_dasl", DOUBLE, "doubleToRawLongBits", "(D)J"),
    call("inv_lasd", DOUBLE, "longBitsToDouble", "(J)D"),
    call("ext_isignum", INTEGER, "signum", "(I)I"),
];

/// Add every helper call to `builder`.
pub fn register(builder: &mut LibraryBuilder, visibility: Visibility) {
    for helper in JAVA_CALL_TABLE {
        builder.define(
            helper.name,
            visibility,
            vec![
                insert_method(helper.owner, helper.method, helper.desc),
                emit("invokestatic"),
            ],
        );
    }
}
