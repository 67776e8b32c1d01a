// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand text and the token rewrite pipeline.
//!
//! Operand text is a fresh, ordered list of fields per invocation. Rewrites
//! mutate it in place and depend only on the current fields and the library
//! tables passed in the context.

use std::fmt;

use crate::core::descriptor::{translate_owner, MethodSpec, OwnerRule, ParmTable};
use crate::core::error::{ExpandError, ExpandErrorKind};
use crate::core::op::{Check, Transform, ValueType};
use crate::core::tracker::{Label, LabelRef};

/// One operand field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Text(String),
    Label(Label),
}

impl Field {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Label(_) => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

/// Library tables and unit state a rewrite may consult.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub parms: Option<&'a ParmTable>,
    pub owners: &'a [OwnerRule],
    pub class_name: &'a str,
    pub value_type: Option<ValueType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandText {
    fields: Vec<Field>,
}

impl OperandText {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self {
            fields: tokens
                .iter()
                .map(|token| Field::Text(token.as_ref().to_string()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn first(&self) -> Option<&Field> {
        self.fields.first()
    }

    pub fn push_front(&mut self, field: Field) {
        self.fields.insert(0, field);
    }

    pub fn take(&mut self) -> Option<Field> {
        if self.fields.is_empty() {
            None
        } else {
            Some(self.fields.remove(0))
        }
    }

    /// Consume the next field as operand text.
    pub fn take_text(&mut self, what: &str) -> Result<String, ExpandError> {
        self.take()
            .map(|field| field.to_string())
            .ok_or_else(|| ExpandError::malformed(format!("missing {what}")))
    }

    /// Consume the next field as a label reference.
    pub fn take_label(&mut self) -> Result<LabelRef, ExpandError> {
        match self.take() {
            Some(Field::Label(label)) => Ok(LabelRef::Generated(label)),
            Some(Field::Text(name)) => Ok(LabelRef::Named(name)),
            None => Err(ExpandError::malformed("missing label operand")),
        }
    }

    /// Consume the next field as an integer literal.
    pub fn take_int(&mut self, what: &str) -> Result<i64, ExpandError> {
        let text = self.take_text(what)?;
        parse_int(&text)
            .ok_or_else(|| ExpandError::malformed(format!("{what} '{text}' is not an integer")))
    }

    pub fn take_all(&mut self) -> Vec<Field> {
        std::mem::take(&mut self.fields)
    }

    fn first_text_mut(&mut self) -> Option<&mut String> {
        match self.fields.first_mut() {
            Some(Field::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn map_first<F>(&mut self, rewrite: F)
    where
        F: FnOnce(&str) -> String,
    {
        if let Some(text) = self.first_text_mut() {
            *text = rewrite(text);
        }
    }

    /// Apply one rewrite step.
    pub fn apply(&mut self, transform: &Transform, ctx: &RewriteContext) -> Result<(), ExpandError> {
        match transform {
            Transform::Swap => {
                if self.fields.len() >= 2 {
                    self.fields.swap(0, 1);
                }
            }
            Transform::Insert(literal) => self.push_front(Field::Text(literal.to_string())),
            Transform::InsertMethod { owner, name, desc } => {
                self.push_front(Field::Text(format!("{owner}/{name}{desc}")))
            }
            Transform::InsertTypeDescriptor => {
                let value_type = ctx
                    .value_type
                    .ok_or_else(|| ExpandError::malformed("missing value type"))?;
                self.push_front(Field::Text(value_type.descriptor().to_string()));
            }
            Transform::Join(separator) => {
                if !self.fields.is_empty() {
                    let joined: Vec<String> =
                        self.fields.iter().map(|field| field.to_string()).collect();
                    self.fields = vec![Field::Text(joined.join(separator))];
                }
            }
            Transform::Replace { from, to } => self.map_first(|text| text.replace(from, to)),
            Transform::RemovePrefix(prefix) => {
                let text = self
                    .first_text_mut()
                    .ok_or_else(|| ExpandError::malformed(format!("missing '{prefix}' operand")))?;
                let stripped = text
                    .strip_prefix(prefix)
                    .ok_or_else(|| {
                        ExpandError::malformed(format!("'{text}' does not start with '{prefix}'"))
                    })?
                    .to_string();
                *text = stripped;
            }
            Transform::Surround { prefix, suffix } => {
                self.map_first(|text| format!("{prefix}{text}{suffix}"))
            }
            Transform::Lower => self.map_first(str::to_ascii_lowercase),
            Transform::Upper => self.map_first(str::to_ascii_uppercase),
            Transform::Skip => {
                self.take();
            }
            Transform::SkipAll => self.fields.clear(),
            Transform::TranslateDescriptor => {
                if let Some(parms) = ctx.parms {
                    self.map_first(|text| parms.translate(text));
                }
            }
            Transform::TranslateMethod => {
                let Some(text) = self.first_text_mut() else {
                    return Err(ExpandError::malformed("missing method operand"));
                };
                let spec = MethodSpec::parse(text).ok_or_else(|| {
                    ExpandError::malformed(format!("'{text}' is not owner/name(descriptor)"))
                })?;
                let owner = translate_owner(ctx.owners, ctx.class_name, spec.owner);
                let desc = match ctx.parms {
                    Some(parms) => parms.translate(spec.desc),
                    None => spec.desc.to_string(),
                };
                *text = format!("{owner}/{}{desc}", spec.name);
            }
        }
        Ok(())
    }

    /// Evaluate one precondition; `Expect` consumes the matched field.
    pub fn check(&mut self, check: &Check) -> Result<(), ExpandError> {
        match check {
            Check::Expect(token) => match self.take() {
                Some(Field::Text(text)) if text == *token => Ok(()),
                Some(field) => Err(assertion(format!("expected '{token}' but found '{field}'"))),
                None => Err(assertion(format!("expected '{token}'"))),
            },
            Check::Reject(token) => {
                if self.fields.iter().any(|field| field.as_text() == Some(*token)) {
                    Err(assertion(format!("'{token}' is not supported")))
                } else {
                    Ok(())
                }
            }
            Check::Contains(substring) => match self.fields.first() {
                Some(Field::Text(text)) if text.contains(substring) => Ok(()),
                Some(field) => Err(assertion(format!("'{field}' does not contain '{substring}'"))),
                None => Err(assertion(format!("missing operand containing '{substring}'"))),
            },
        }
    }
}

fn assertion(message: String) -> ExpandError {
    ExpandError::new(ExpandErrorKind::AssertionFailed, message)
}

/// Decimal or `0x` hexadecimal integer, optionally signed.
pub fn parse_int(text: &str) -> Option<i64> {
    match parse_magnitude(text)? {
        (true, magnitude) if magnitude <= 1 << 63 => Some((magnitude as i64).wrapping_neg()),
        (true, _) => None,
        (false, magnitude) => i64::try_from(magnitude).ok(),
    }
}

/// Sign and unsigned magnitude of an integer literal.
pub fn parse_magnitude(text: &str) -> Option<(bool, u64)> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, digits),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    Some((negative, magnitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARMS: ParmTable = ParmTable {
        arrow: "->",
        void_markers: &["->V00", "->()"],
        separator: ",",
        types: &[("I32", "I"), ("I64", "J"), ("F32", "F"), ("F64", "D")],
    };

    fn ctx() -> RewriteContext<'static> {
        RewriteContext {
            parms: Some(&PARMS),
            owners: &[OwnerRule::Package {
                prefix: "wasi",
                package: "wasi/trampoline/",
            }],
            class_name: "demo/Module",
            value_type: None,
        }
    }

    fn texts(operand: &OperandText) -> Vec<String> {
        operand.fields().iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn call_indirect_prefix_chain() {
        let mut operand = OperandText::from_tokens(&["0", "(I32)->I32"]);
        let ctx = ctx();
        operand
            .apply(&Transform::Surround { prefix: "__Table__", suffix: "" }, &ctx)
            .expect("prepend");
        operand
            .apply(&Transform::Insert("Lwasmrun/Table;"), &ctx)
            .expect("insert");
        operand.apply(&Transform::Swap, &ctx).expect("swap");
        assert_eq!(
            texts(&operand),
            ["__Table__0", "Lwasmrun/Table;", "(I32)->I32"]
        );
    }

    #[test]
    fn join_collapses_member_reference() {
        let mut operand = OperandText::from_tokens(&["java/lang/Math.abs", "(I)I"]);
        operand.apply(&Transform::Join(""), &ctx()).expect("join");
        assert_eq!(texts(&operand), ["java/lang/Math.abs(I)I"]);
    }

    #[test]
    fn remove_prefix_fails_on_mismatch() {
        let mut operand = OperandText::from_tokens(&["T_INT"]);
        operand
            .apply(&Transform::RemovePrefix("T_"), &ctx())
            .expect("prefix");
        operand.apply(&Transform::Lower, &ctx()).expect("lower");
        assert_eq!(texts(&operand), ["int"]);

        let mut bad = OperandText::from_tokens(&["INT"]);
        let err = bad
            .apply(&Transform::RemovePrefix("T_"), &ctx())
            .unwrap_err();
        assert_eq!(err.kind(), ExpandErrorKind::MalformedOperand);
        assert_eq!(texts(&bad), ["INT"]);
    }

    #[test]
    fn skip_and_missing_fields_are_total() {
        let mut operand = OperandText::default();
        operand.apply(&Transform::Skip, &ctx()).expect("skip");
        operand.apply(&Transform::Swap, &ctx()).expect("swap");
        operand.apply(&Transform::Upper, &ctx()).expect("upper");
        assert!(operand.is_empty());
    }

    #[test]
    fn translate_method_resolves_owner_and_descriptor() {
        let mut local = OperandText::from_tokens(&["helper(I32,I64)->()"]);
        local
            .apply(&Transform::TranslateMethod, &ctx())
            .expect("local");
        assert_eq!(texts(&local), ["demo/Module/helper(IJ)V"]);

        let mut env = OperandText::from_tokens(&["wasi_unstable/fd_write(I32,I32,I32,I32)->I32"]);
        env.apply(&Transform::TranslateMethod, &ctx()).expect("env");
        assert_eq!(
            texts(&env),
            ["wasi/trampoline/Wasi_unstable/fd_write(IIII)I"]
        );

        let mut bad = OperandText::from_tokens(&["nodescriptor"]);
        assert!(bad.apply(&Transform::TranslateMethod, &ctx()).is_err());
    }

    #[test]
    fn checks_consume_or_inspect() {
        let mut operand = OperandText::from_tokens(&["=", "4"]);
        operand.check(&Check::Expect("=")).expect("expect");
        assert_eq!(texts(&operand), ["4"]);
        let err = operand.check(&Check::Expect(":")).unwrap_err();
        assert_eq!(err.kind(), ExpandErrorKind::AssertionFailed);

        let mut itf = OperandText::from_tokens(&["a/B.m", "()V", "{itf}"]);
        assert!(itf.check(&Check::Reject("{itf}")).is_err());
        assert!(itf.check(&Check::Contains("a/B")).is_ok());
    }

    #[test]
    fn parses_integer_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("+7"), Some(7));
        assert_eq!(parse_int("x"), None);
        assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775808"), None);
        assert_eq!(parse_int("0x-5"), None);
        assert_eq!(parse_magnitude("0xFFFFFFFFFFFFFFFF"), Some((false, u64::MAX)));
        assert_eq!(parse_magnitude("-0x8000000000000000"), Some((true, 1 << 63)));
    }
}
