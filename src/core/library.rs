// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Macro library tables and their two-phase construction.
//!
//! A library is built by registering every entry first, then resolving
//! macro references by name, then validating the whole table. Declaration
//! order never matters, and a table that passes `build` is immutable.

use std::collections::HashMap;

use crate::core::descriptor::{OwnerRule, ParmTable};
use crate::core::dyncall::DynCallSpecError;
use crate::core::error::{ConfigError, ExpandError, ExpandErrorKind};
use crate::core::op::{EntryId, IndentRole, Op, ValueType, Visibility};
use crate::core::target::TargetIsa;

/// Named boolean switches a host honours while driving a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroOption {
    /// Branches are written as nesting depths, not label names.
    StructuredLabels,
    /// Unsigned 64-bit literal operands are accepted.
    UnsignedLong,
    /// Listings are indented by construct nesting.
    Indent,
}

impl MacroOption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StructuredLabels => "structured-labels",
            Self::UnsignedLong => "unsigned-long",
            Self::Indent => "indent",
        }
    }
}

/// Source-text label predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSyntax {
    /// A fixed letter followed by one or more ASCII digits (`L12`).
    PrefixedDigits(char),
}

impl LabelSyntax {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::PrefixedDigits(prefix) => text
                .strip_prefix(*prefix)
                .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::PrefixedDigits(prefix) => format!("{prefix}[0-9]+"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LibraryConfig {
    pub label_syntax: Option<LabelSyntax>,
    pub parms: Option<ParmTable>,
    pub owners: &'static [OwnerRule],
    pub options: Vec<MacroOption>,
}

/// One named table entry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: &'static str,
    pub visibility: Visibility,
    pub body: Vec<Op>,
    /// Value type of typed entries (`I64_...`), used by selectors.
    pub value_type: Option<ValueType>,
    pub indent: IndentRole,
}

/// Entry under construction; attributes are set by chaining.
#[derive(Debug, Clone)]
pub struct EntrySpec {
    entry: Entry,
}

impl EntrySpec {
    pub fn typed(&mut self, value_type: ValueType) -> &mut Self {
        self.entry.value_type = Some(value_type);
        self
    }

    pub fn opens(&mut self) -> &mut Self {
        self.entry.indent = IndentRole::Begin;
        self
    }

    pub fn reopens(&mut self) -> &mut Self {
        self.entry.indent = IndentRole::Else;
        self
    }

    pub fn closes(&mut self) -> &mut Self {
        self.entry.indent = IndentRole::End;
        self
    }
}

pub struct LibraryBuilder {
    name: &'static str,
    isa: &'static TargetIsa,
    config: LibraryConfig,
    entries: Vec<EntrySpec>,
}

impl LibraryBuilder {
    pub fn new(name: &'static str, isa: &'static TargetIsa) -> Self {
        Self {
            name,
            isa,
            config: LibraryConfig::default(),
            entries: Vec::new(),
        }
    }

    pub fn set_parms(&mut self, parms: ParmTable) -> &mut Self {
        self.config.parms = Some(parms);
        self
    }

    pub fn set_owners(&mut self, owners: &'static [OwnerRule]) -> &mut Self {
        self.config.owners = owners;
        self
    }

    pub fn set_label_syntax(&mut self, syntax: LabelSyntax) -> &mut Self {
        self.config.label_syntax = Some(syntax);
        self
    }

    pub fn enable(&mut self, option: MacroOption) -> &mut Self {
        if !self.config.options.contains(&option) {
            self.config.options.push(option);
        }
        self
    }

    pub fn define(&mut self, name: &'static str, visibility: Visibility, body: Vec<Op>) -> &mut EntrySpec {
        self.entries.push(EntrySpec {
            entry: Entry {
                name,
                visibility,
                body,
                value_type: None,
                indent: IndentRole::None,
            },
        });
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn external(&mut self, name: &'static str, body: Vec<Op>) -> &mut EntrySpec {
        self.define(name, Visibility::External, body)
    }

    pub fn auxiliary(&mut self, name: &'static str, body: Vec<Op>) -> &mut EntrySpec {
        self.define(name, Visibility::Auxiliary, body)
    }

    /// Resolve references and validate the table.
    pub fn build(self) -> Result<MacroLibrary, ConfigError> {
        let library = self.name.to_string();
        let mut entries: Vec<Entry> = self.entries.into_iter().map(|spec| spec.entry).collect();

        let mut index: HashMap<String, EntryId> = HashMap::new();
        for (id, entry) in entries.iter().enumerate() {
            if index.insert(entry.name.to_string(), id).is_some() {
                return Err(ConfigError::DuplicateMnemonic {
                    library,
                    mnemonic: entry.name.to_string(),
                });
            }
        }

        for entry in entries.iter_mut() {
            let name = entry.name;
            resolve_refs(&mut entry.body, &index).map_err(|target| {
                ConfigError::UnknownReference {
                    library: library.clone(),
                    entry: name.to_string(),
                    target: target.to_string(),
                }
            })?;
        }

        if let Some(path) = find_cycle(&entries) {
            return Err(ConfigError::Cycle { library, path });
        }

        for entry in &entries {
            validate_ops(&entry.body, self.isa, self.config.parms.as_ref()).map_err(
                |problem| match problem {
                    OpProblem::UnknownOpcode(opcode) => ConfigError::UnknownTargetOp {
                        library: library.clone(),
                        entry: entry.name.to_string(),
                        opcode: opcode.to_string(),
                    },
                    OpProblem::DynCall(DynCallSpecError::Template(template)) => {
                        ConfigError::DescriptorTemplate {
                            library: library.clone(),
                            entry: entry.name.to_string(),
                            template,
                        }
                    }
                    OpProblem::DynCall(DynCallSpecError::Bootstrap(message)) => {
                        ConfigError::BootstrapArity {
                            library: library.clone(),
                            entry: entry.name.to_string(),
                            message,
                        }
                    }
                },
            )?;

            let derived = derived_indent(&entry.body, &entries);
            if derived != Some(entry.indent) {
                return Err(ConfigError::IndentRole {
                    library: library.clone(),
                    entry: entry.name.to_string(),
                    declared: entry.indent.as_str().to_string(),
                    derived: derived.map_or("mixed", IndentRole::as_str).to_string(),
                });
            }
        }

        if !entries
            .iter()
            .any(|entry| entry.visibility == Visibility::External)
        {
            return Err(ConfigError::NoExternalEntries { library });
        }

        let mut lookup = index;
        let mut folded: HashMap<String, Vec<EntryId>> = HashMap::new();
        for (id, entry) in entries.iter().enumerate() {
            let key = normalize_mnemonic(entry.name);
            if !lookup.contains_key(&key) {
                folded.entry(key).or_default().push(id);
            }
        }
        let mut ambiguous: HashMap<String, Vec<EntryId>> = HashMap::new();
        for (key, ids) in folded {
            match ids.as_slice() {
                [id] => {
                    lookup.insert(key, *id);
                }
                _ => {
                    ambiguous.insert(key, ids);
                }
            }
        }

        Ok(MacroLibrary {
            name: self.name,
            isa: self.isa,
            config: self.config,
            entries,
            lookup,
            ambiguous,
        })
    }
}

/// Canonical spelling of a mnemonic: upper case, `.` written as `_`.
pub fn normalize_mnemonic(name: &str) -> String {
    name.to_ascii_uppercase().replace('.', "_")
}

fn resolve_refs(ops: &mut [Op], index: &HashMap<String, EntryId>) -> Result<(), &'static str> {
    for op in ops {
        match op {
            Op::Call(reference) => {
                let name = reference.name;
                match index.get(name) {
                    Some(id) => reference.target = Some(*id),
                    None => return Err(name),
                }
            }
            Op::Seq(inner) => resolve_refs(inner, index)?,
            Op::Select { single, double } => {
                resolve_refs(single, index)?;
                resolve_refs(double, index)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn collect_calls(ops: &[Op], out: &mut Vec<EntryId>) {
    for op in ops {
        match op {
            Op::Call(reference) => out.extend(reference.target),
            Op::Seq(inner) => collect_calls(inner, out),
            Op::Select { single, double } => {
                collect_calls(single, out);
                collect_calls(double, out);
            }
            _ => {}
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

fn find_cycle(entries: &[Entry]) -> Option<Vec<String>> {
    let edges: Vec<Vec<EntryId>> = entries
        .iter()
        .map(|entry| {
            let mut calls = Vec::new();
            collect_calls(&entry.body, &mut calls);
            calls
        })
        .collect();
    let mut marks = vec![Mark::Unvisited; entries.len()];
    let mut stack = Vec::new();
    for root in 0..entries.len() {
        if marks[root] == Mark::Unvisited {
            if let Some(cycle) = visit(root, &edges, &mut marks, &mut stack) {
                return Some(cycle.into_iter().map(|id| entries[id].name.to_string()).collect());
            }
        }
    }
    None
}

fn visit(
    node: EntryId,
    edges: &[Vec<EntryId>],
    marks: &mut [Mark],
    stack: &mut Vec<EntryId>,
) -> Option<Vec<EntryId>> {
    marks[node] = Mark::Active;
    stack.push(node);
    for &next in &edges[node] {
        match marks[next] {
            Mark::Active => {
                let start = stack.iter().position(|&id| id == next).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, edges, marks, stack) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
    None
}

enum OpProblem {
    UnknownOpcode(&'static str),
    DynCall(DynCallSpecError),
}

fn validate_ops(ops: &[Op], isa: &TargetIsa, parms: Option<&ParmTable>) -> Result<(), OpProblem> {
    for op in ops {
        match op {
            Op::Emit(opcode) => {
                if !isa.has(opcode) {
                    return Err(OpProblem::UnknownOpcode(*opcode));
                }
            }
            Op::EmitByType(opcodes) => {
                if let Some(opcode) = opcodes.iter().find(|opcode| !isa.has(opcode)) {
                    return Err(OpProblem::UnknownOpcode(*opcode));
                }
            }
            Op::DynCall(spec) => spec.validate(parms).map_err(OpProblem::DynCall)?,
            Op::Seq(inner) => validate_ops(inner, isa, parms)?,
            Op::Select { single, double } => {
                validate_ops(single, isa, parms)?;
                validate_ops(double, isa, parms)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Indent role implied by the control ops an entry expands to; `None`
/// when they disagree.
fn derived_indent(ops: &[Op], entries: &[Entry]) -> Option<IndentRole> {
    let mut roles = Vec::new();
    collect_roles(ops, entries, &mut roles);
    roles.retain(|role| *role != IndentRole::None);
    roles.dedup();
    match roles.as_slice() {
        [] => Some(IndentRole::None),
        [role] => Some(*role),
        _ => None,
    }
}

fn collect_roles(ops: &[Op], entries: &[Entry], out: &mut Vec<IndentRole>) {
    for op in ops {
        match op {
            Op::Control(kind) => out.push(kind.indent_role()),
            Op::Call(reference) => {
                if let Some(entry) = reference.target.and_then(|id| entries.get(id)) {
                    collect_roles(&entry.body, entries, out);
                }
            }
            Op::Seq(inner) => collect_roles(inner, entries, out),
            Op::Select { single, double } => {
                collect_roles(single, entries, out);
                collect_roles(double, entries, out);
            }
            _ => {}
        }
    }
}

/// Validated, immutable macro library.
#[derive(Debug)]
pub struct MacroLibrary {
    name: &'static str,
    isa: &'static TargetIsa,
    config: LibraryConfig,
    entries: Vec<Entry>,
    lookup: HashMap<String, EntryId>,
    /// Canonical spellings shared by several entries; only their exact
    /// names resolve.
    ambiguous: HashMap<String, Vec<EntryId>>,
}

impl MacroLibrary {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn isa(&self) -> &'static TargetIsa {
        self.isa
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn has_option(&self, option: MacroOption) -> bool {
        self.config.options.contains(&option)
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Resolve a source mnemonic to an invocable entry.
    pub fn lookup(&self, mnemonic: &str) -> Result<(EntryId, &Entry), ExpandError> {
        let key = normalize_mnemonic(mnemonic);
        let id = match self.lookup.get(mnemonic).or_else(|| self.lookup.get(&key)) {
            Some(id) => *id,
            None => {
                let message = match self.ambiguous.get(&key) {
                    Some(ids) => {
                        let names: Vec<&str> = ids.iter().map(|id| self.entries[*id].name).collect();
                        format!(
                            "ambiguous mnemonic in library {}; use one of {}",
                            self.name,
                            names.join(", ")
                        )
                    }
                    None => format!("unknown mnemonic in library {}", self.name),
                };
                return Err(ExpandError::new(ExpandErrorKind::UnknownMnemonic, message)
                    .with_mnemonic(mnemonic));
            }
        };
        let entry = &self.entries[id];
        if entry.visibility == Visibility::Auxiliary {
            return Err(ExpandError::new(
                ExpandErrorKind::NotInvocable,
                "auxiliary macro cannot be invoked directly",
            )
            .with_mnemonic(mnemonic));
        }
        Ok((id, entry))
    }

    pub fn visibility(&self, mnemonic: &str) -> Option<Visibility> {
        self.lookup
            .get(mnemonic)
            .map(|id| self.entries[*id].visibility)
    }

    /// Invocable mnemonics, sorted.
    pub fn external_mnemonics(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .entries
            .iter()
            .filter(|entry| entry.visibility == Visibility::External)
            .map(|entry| entry.name)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn is_label(&self, text: &str) -> bool {
        self.config
            .label_syntax
            .is_some_and(|syntax| syntax.matches(text))
    }

    pub fn label_syntax(&self) -> Option<LabelSyntax> {
        self.config.label_syntax
    }

    pub fn parms(&self) -> Option<&ParmTable> {
        self.config.parms.as_ref()
    }

    pub fn owners(&self) -> &'static [OwnerRule] {
        self.config.owners
    }
}
