// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Descriptor and owner translation across the source/target type systems.
//!
//! Source signatures use value-type placeholders (`(I32,I64)->F64`); target
//! descriptors use single-letter codes (`(IJ)D`). Translation is a fixed
//! table substitution supplied per library.

/// Parameter-type substitution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParmTable {
    /// Marker separating parameters from the result. Text without it is
    /// already in target syntax and passes through unchanged.
    pub arrow: &'static str,
    /// Result spellings meaning "no return value"; each becomes `V`.
    pub void_markers: &'static [&'static str],
    pub separator: &'static str,
    pub types: &'static [(&'static str, &'static str)],
}

impl ParmTable {
    pub fn translate(&self, text: &str) -> String {
        if !text.contains(self.arrow) {
            return text.to_string();
        }
        let mut out = text.to_string();
        for marker in self.void_markers {
            out = out.replace(marker, "V");
        }
        out = out.replace(self.arrow, "");
        out = out.replace(self.separator, "");
        for (from, to) in self.types {
            out = out.replace(from, to);
        }
        out
    }

    /// True if any source placeholder survives in `text`.
    pub fn has_placeholder(&self, text: &str) -> bool {
        text.contains(self.arrow) || self.types.iter().any(|(from, _)| text.contains(from))
    }
}

/// Owner-name substitution rule. The table is explicit; names that match
/// no rule pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerRule {
    /// Owners with at most one path component that start with `prefix` are
    /// moved into `package` with their first letter upper-cased.
    Package {
        prefix: &'static str,
        package: &'static str,
    },
    Exact {
        from: &'static str,
        to: &'static str,
    },
}

impl OwnerRule {
    fn apply(&self, owner: &str) -> Option<String> {
        match self {
            Self::Package { prefix, package } => {
                if owner.matches('/').count() > 1 || !owner.starts_with(prefix) {
                    return None;
                }
                let mut chars = owner.chars();
                let first = chars.next()?;
                Some(format!(
                    "{package}{}{}",
                    first.to_ascii_uppercase(),
                    chars.as_str()
                ))
            }
            Self::Exact { from, to } => (owner == *from).then(|| to.to_string()),
        }
    }
}

/// Resolve an owner field. A missing owner, or `.`, is the current class.
pub fn translate_owner(rules: &[OwnerRule], class_name: &str, owner: Option<&str>) -> String {
    match owner {
        None | Some("") | Some(".") => class_name.to_string(),
        Some(owner) => rules
            .iter()
            .find_map(|rule| rule.apply(owner))
            .unwrap_or_else(|| owner.to_string()),
    }
}

/// `owner/name(descriptor)` split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec<'a> {
    pub owner: Option<&'a str>,
    pub name: &'a str,
    pub desc: &'a str,
}

impl<'a> MethodSpec<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        let open = text.find('(')?;
        let (head, desc) = text.split_at(open);
        let (owner, name) = match head.rfind('/') {
            Some(idx) => (Some(&head[..idx]), &head[idx + 1..]),
            None => (None, head),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self { owner, name, desc })
    }
}

/// Length of the field type starting at the front of `text`.
fn field_type_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut idx = 0usize;
    while bytes.get(idx) == Some(&b'[') {
        idx += 1;
    }
    match bytes.get(idx)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(idx + 1),
        b'L' => {
            let end = text[idx..].find(';')?;
            if end < 2 {
                return None;
            }
            Some(idx + end + 1)
        }
        _ => None,
    }
}

/// Split a concatenated list of field types (`ILjava/lang/String;[J`).
pub fn parse_type_list(text: &str) -> Option<Vec<&str>> {
    let mut types = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let len = field_type_len(rest)?;
        types.push(&rest[..len]);
        rest = &rest[len..];
    }
    Some(types)
}

/// Parse `(params)return`, returning parameter types and the return type.
pub fn parse_method_descriptor(text: &str) -> Option<(Vec<&str>, &str)> {
    let inner = text.strip_prefix('(')?;
    let close = inner.find(')')?;
    let params = parse_type_list(&inner[..close])?;
    let ret = &inner[close + 1..];
    if ret == "V" || field_type_len(ret) == Some(ret.len()) {
        Some((params, ret))
    } else {
        None
    }
}
