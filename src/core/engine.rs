// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Macro expansion for one translation unit.
//!
//! `TranslationUnit` owns the only mutable state of a translation: the
//! control tracker and the call-site counter. Libraries are borrowed
//! read-only and may be shared by any number of units.

use crate::core::dyncall::{BootstrapCallSite, CallSiteId, DynCallSpec, StaticArg, StaticArgSpec};
use crate::core::descriptor::parse_method_descriptor;
use crate::core::emit::{DiagnosticSink, EmissionSink, Primitive};
use crate::core::error::{Diagnostic, ExpandError, ExpandErrorKind, Severity, IGNORED_OP_CODE};
use crate::core::library::{MacroLibrary, MacroOption};
use crate::core::op::{Condition, ControlKind, IndentRole, Notice, Op, SlotWidth, Transform, ValueType};
use crate::core::target::{OperandForm, TargetInsn};
use crate::core::tokens::{Field, OperandText, RewriteContext};
use crate::core::tracker::{ControlTracker, Label, LabelRef};

/// What the host does after an instruction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Report, discard the instruction and carry on.
    #[default]
    Continue,
    /// Report and stop the unit.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConfig {
    /// Qualifier for relative owners (`.` or a bare method name).
    pub class_name: String,
    pub error_policy: ErrorPolicy,
    pub warnings_as_errors: bool,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            class_name: "Module".to_string(),
            error_policy: ErrorPolicy::Continue,
            warnings_as_errors: false,
        }
    }
}

/// Result of expanding one source instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub mnemonic: String,
    pub primitives: Vec<Primitive>,
    /// Labels allocated by this instruction, in allocation order.
    pub labels: Vec<Label>,
    /// Listing indentation of the source line.
    pub indent: usize,
    /// Messages from ops that are accepted but have no effect.
    pub notices: Vec<String>,
}

/// Per-invocation state threaded through the op tree.
struct Invocation<'a> {
    mnemonic: &'a str,
    operand: OperandText,
    annotated: Option<ValueType>,
    local_label: Option<Label>,
    out: Vec<Primitive>,
    notices: Vec<String>,
}

pub struct TranslationUnit<'lib> {
    library: &'lib MacroLibrary,
    config: UnitConfig,
    tracker: ControlTracker,
    next_call_site: u32,
    line: u32,
    errors: usize,
    warnings: usize,
}

impl<'lib> TranslationUnit<'lib> {
    pub fn new(library: &'lib MacroLibrary, config: UnitConfig) -> Self {
        Self::with_tracker(library, config, ControlTracker::new())
    }

    pub fn with_tracker(library: &'lib MacroLibrary, config: UnitConfig, tracker: ControlTracker) -> Self {
        Self {
            library,
            config,
            tracker,
            next_call_site: 0,
            line: 0,
            errors: 0,
            warnings: 0,
        }
    }

    pub fn library(&self) -> &'lib MacroLibrary {
        self.library
    }

    pub fn config(&self) -> &UnitConfig {
        &self.config
    }

    pub fn tracker(&self) -> &ControlTracker {
        &self.tracker
    }

    /// Source line attached to subsequent diagnostics.
    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Expand one instruction. On failure the tracker and call-site counter
    /// are left exactly as they were before the call.
    pub fn expand(&mut self, mnemonic: &str, operands: &[&str]) -> Result<Expansion, ExpandError> {
        let library = self.library;
        let (_, entry) = library.lookup(mnemonic)?;
        let snapshot = self.tracker.clone();
        let call_sites = self.next_call_site;
        let indent_before = self.tracker.indent();
        let first_label = self.tracker.labels_allocated();

        let mut inv = Invocation {
            mnemonic,
            operand: OperandText::from_tokens(operands),
            annotated: None,
            local_label: None,
            out: Vec::new(),
            notices: Vec::new(),
        };
        let result = self
            .run(&mut inv, &entry.body, entry.value_type)
            .and_then(|()| leftover_check(&inv.operand));
        if let Err(err) = result {
            self.tracker = snapshot;
            self.next_call_site = call_sites;
            return Err(err.with_mnemonic(mnemonic));
        }

        let indent = match entry.indent {
            IndentRole::None | IndentRole::Begin => indent_before,
            IndentRole::Else => indent_before.saturating_sub(1),
            IndentRole::End => self.tracker.indent(),
        };
        Ok(Expansion {
            mnemonic: mnemonic.to_string(),
            primitives: inv.out,
            labels: (first_label..self.tracker.labels_allocated()).map(Label).collect(),
            indent,
            notices: inv.notices,
        })
    }

    /// Expand one instruction, hand its primitives to `sink` and report
    /// failures to `diagnostics`, one diagnostic per failure.
    ///
    /// Returns `Err` only when the error policy stops the unit.
    pub fn translate(
        &mut self,
        mnemonic: &str,
        operands: &[&str],
        sink: &mut dyn EmissionSink,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Result<Option<Expansion>, ExpandError> {
        let snapshot = self.tracker.clone();
        let call_sites = self.next_call_site;
        let outcome = self.expand(mnemonic, operands).and_then(|expansion| {
            for primitive in &expansion.primitives {
                sink.emit(primitive).map_err(|reason| {
                    ExpandError::new(ExpandErrorKind::SinkRejected, reason).with_mnemonic(mnemonic)
                })?;
            }
            Ok(expansion)
        });
        match outcome {
            Ok(expansion) => {
                for notice in &expansion.notices {
                    let diag = Diagnostic::new(self.line, Severity::Warning, notice.clone())
                        .with_code(IGNORED_OP_CODE)
                        .with_mnemonic(mnemonic);
                    self.report(diag, diagnostics);
                }
                Ok(Some(expansion))
            }
            Err(err) => {
                self.tracker = snapshot;
                self.next_call_site = call_sites;
                let severity = self.report(Diagnostic::from_expand_error(self.line, &err), diagnostics);
                if severity == Severity::Error && self.config.error_policy == ErrorPolicy::Abort {
                    Err(err)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// End-of-unit checks; leftover constructs are reported by opener.
    pub fn finish(&mut self, diagnostics: &mut dyn DiagnosticSink) -> Result<(), ExpandError> {
        match self.tracker.finish() {
            Ok(()) => Ok(()),
            Err(errors) => {
                for err in &errors {
                    self.report(Diagnostic::from_expand_error(self.line, err), diagnostics);
                }
                Err(errors
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| ExpandError::unbalanced("unbalanced unit")))
            }
        }
    }

    fn report(&mut self, diag: Diagnostic, diagnostics: &mut dyn DiagnosticSink) -> Severity {
        let diag = if self.config.warnings_as_errors && diag.severity() == Severity::Warning {
            diag.with_severity(Severity::Error)
        } else {
            diag
        };
        let severity = diag.severity();
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
        diagnostics.report(diag);
        severity
    }

    fn run(&mut self, inv: &mut Invocation, ops: &[Op], declared: Option<ValueType>) -> Result<(), ExpandError> {
        let library = self.library;
        for op in ops {
            match op {
                Op::Emit(opcode) => {
                    let insn = target_insn(library, opcode)?;
                    self.emit_insn(inv, insn)?;
                }
                Op::EmitByType(opcodes) => {
                    let value_type = resolve_type(inv, declared)?;
                    let insn = target_insn(library, opcodes[value_type.index()])?;
                    self.emit_insn(inv, insn)?;
                }
                Op::LoadConst(value_type) => {
                    let text = inv.operand.take_text("constant")?;
                    let unsigned = library.has_option(MacroOption::UnsignedLong);
                    let (opcode, operand) = (library.isa().load_const)(*value_type, &text, unsigned)
                        .map_err(ExpandError::malformed)?;
                    inv.out.push(Primitive::Insn {
                        opcode,
                        operands: operand.into_iter().collect(),
                    });
                }
                Op::Rewrite(transform) => {
                    let value_type = match transform {
                        Transform::InsertTypeDescriptor => Some(resolve_type(inv, declared)?),
                        _ => None,
                    };
                    let ctx = RewriteContext {
                        parms: library.parms(),
                        owners: library.owners(),
                        class_name: &self.config.class_name,
                        value_type,
                    };
                    inv.operand.apply(transform, &ctx)?;
                }
                Op::Assert(check) => inv.operand.check(check)?,
                Op::Diagnose(Notice::Unsupported(hint)) => {
                    return Err(ExpandError::new(ExpandErrorKind::UnsupportedOperation, *hint));
                }
                Op::Diagnose(Notice::Ignored(reason)) => inv.notices.push(reason.to_string()),
                Op::DynCall(spec) => {
                    let site = self.call_site(inv, spec)?;
                    inv.out.push(Primitive::DynCall(site));
                }
                Op::Select { single, double } => {
                    let branch = match resolve_type(inv, declared)?.width() {
                        SlotWidth::Single => single,
                        SlotWidth::Double => double,
                    };
                    self.run(inv, branch, declared)?;
                }
                Op::Control(kind) => self.lower_control(inv, *kind, declared)?,
                Op::JumpIf(condition) => {
                    let target = self.take_label(inv)?;
                    self.jump_on(inv, *condition, false, target);
                }
                Op::LocalLabel => {
                    let label = match inv.local_label {
                        Some(label) => label,
                        None => {
                            let label = self.tracker.alloc_label();
                            inv.local_label = Some(label);
                            label
                        }
                    };
                    inv.operand.push_front(Field::Label(label));
                }
                Op::PlaceLabel => {
                    let label = self.take_label(inv)?;
                    inv.out.push(Primitive::Label(label));
                }
                Op::Call(reference) => {
                    let entry = reference
                        .target
                        .and_then(|id| library.entry(id))
                        .ok_or_else(|| {
                            ExpandError::malformed(format!("unresolved macro '{}'", reference.name))
                        })?;
                    self.run(inv, &entry.body, entry.value_type.or(declared))?;
                }
                Op::Seq(inner) => self.run(inv, inner, declared)?,
            }
        }
        Ok(())
    }

    fn emit_insn(&mut self, inv: &mut Invocation, insn: &TargetInsn) -> Result<(), ExpandError> {
        let primitive = match insn.form {
            OperandForm::None => Primitive::insn(insn.name),
            OperandForm::One => Primitive::Insn {
                opcode: insn.name,
                operands: vec![inv.operand.take_text(&format!("{} operand", insn.name))?],
            },
            OperandForm::Two => {
                let what = format!("{} operand", insn.name);
                let first = inv.operand.take_text(&what)?;
                let second = inv.operand.take_text(&what)?;
                Primitive::Insn {
                    opcode: insn.name,
                    operands: vec![first, second],
                }
            }
            OperandForm::Label => Primitive::Jump {
                opcode: insn.name,
                target: self.take_label(inv)?,
            },
            OperandForm::Rest => Primitive::Insn {
                opcode: insn.name,
                operands: inv
                    .operand
                    .take_all()
                    .into_iter()
                    .map(|field| field.to_string())
                    .collect(),
            },
        };
        inv.out.push(primitive);
        Ok(())
    }

    fn take_label(&self, inv: &mut Invocation) -> Result<LabelRef, ExpandError> {
        let label = inv.operand.take_label()?;
        if let LabelRef::Named(name) = &label {
            if self.library.has_option(MacroOption::StructuredLabels) {
                return Err(ExpandError::malformed(format!(
                    "named label '{name}' in library {}; branch by nesting depth instead",
                    self.library.name()
                )));
            }
        }
        if let (LabelRef::Named(name), Some(syntax)) = (&label, self.library.label_syntax()) {
            if !syntax.matches(name) {
                return Err(ExpandError::malformed(format!(
                    "'{name}' is not a label (expected {})",
                    syntax.describe()
                )));
            }
        }
        Ok(label)
    }

    fn jump_on(&self, inv: &mut Invocation, condition: Condition, negate: bool, target: LabelRef) {
        let lowering = (self.library.isa().lower_condition)(condition, negate);
        for &(opcode, operand) in lowering.prelude {
            inv.out.push(Primitive::Insn {
                opcode,
                operands: operand.iter().map(|text| text.to_string()).collect(),
            });
        }
        inv.out.push(Primitive::Jump {
            opcode: lowering.jump,
            target,
        });
    }

    fn goto(&self, inv: &mut Invocation, target: Label) {
        inv.out.push(Primitive::Jump {
            opcode: self.library.isa().goto,
            target: LabelRef::Generated(target),
        });
    }

    fn lower_control(
        &mut self,
        inv: &mut Invocation,
        kind: ControlKind,
        declared: Option<ValueType>,
    ) -> Result<(), ExpandError> {
        match kind {
            ControlKind::Block => {
                self.tracker.open_block(inv.mnemonic);
            }
            ControlKind::Loop => {
                let entry = self.tracker.open_loop(inv.mnemonic);
                inv.out.push(Primitive::Label(LabelRef::Generated(entry)));
            }
            ControlKind::If(condition) => {
                let else_label = self.tracker.open_if(inv.mnemonic);
                self.jump_on(inv, condition, true, LabelRef::Generated(else_label));
            }
            ControlKind::Else => {
                let (exit, else_label) = self.tracker.enter_else()?;
                self.goto(inv, exit);
                inv.out.push(Primitive::Label(LabelRef::Generated(else_label)));
            }
            ControlKind::End => {
                let frame = self.tracker.close()?;
                if let Some(pending) = frame.pending_else {
                    inv.out.push(Primitive::Label(LabelRef::Generated(pending)));
                }
                inv.out.push(Primitive::Label(LabelRef::Generated(frame.exit)));
            }
            ControlKind::Branch => {
                let depth = take_depth(&mut inv.operand)?;
                let target = self.tracker.branch_target(depth)?;
                self.goto(inv, target);
            }
            ControlKind::BranchIf(condition) => {
                let depth = take_depth(&mut inv.operand)?;
                let target = self.tracker.branch_target(depth)?;
                self.jump_on(inv, condition, false, LabelRef::Generated(target));
            }
            ControlKind::BranchTable => {
                let mut targets = Vec::new();
                while !inv.operand.is_empty() {
                    let depth = take_depth(&mut inv.operand)?;
                    targets.push(LabelRef::Generated(self.tracker.branch_target(depth)?));
                }
                let default = targets
                    .pop()
                    .ok_or_else(|| ExpandError::malformed("branch table needs a default depth"))?;
                inv.out.push(Primitive::TableSwitch {
                    opcode: self.library.isa().table_switch,
                    low: 0,
                    default,
                    targets,
                });
            }
            ControlKind::Return => {
                let value_type = match declared.or(inv.annotated) {
                    Some(value_type) => Some(value_type),
                    None => match inv.operand.first().and_then(Field::as_text) {
                        Some(text) => {
                            let parsed = ValueType::parse_annotation(text);
                            if parsed.is_some() {
                                inv.operand.take();
                            }
                            parsed
                        }
                        None => None,
                    },
                };
                let isa = self.library.isa();
                let opcode = match value_type {
                    Some(value_type) => isa.typed_return[value_type.index()],
                    None => isa.void_return,
                };
                inv.out.push(Primitive::insn(opcode));
            }
        }
        Ok(())
    }

    fn call_site(&mut self, inv: &mut Invocation, spec: &DynCallSpec) -> Result<BootstrapCallSite, ExpandError> {
        let parms = self.library.parms();
        let descriptor = match spec.descriptor {
            Some(template) => spec.resolved_descriptor(parms).ok_or_else(|| {
                ExpandError::malformed(format!("descriptor template '{template}' is not valid"))
            })?,
            None => {
                let text = inv.operand.take_text("call site descriptor")?;
                let desc = match parms {
                    Some(table) => table.translate(&text),
                    None => text,
                };
                if parse_method_descriptor(&desc).is_none() {
                    return Err(ExpandError::malformed(format!("'{desc}' is not a method descriptor")));
                }
                desc
            }
        };

        let mut static_args = Vec::with_capacity(spec.bootstrap.static_args.len());
        for arg in &spec.bootstrap.static_args {
            match arg {
                StaticArgSpec::Fixed(value) => static_args.push(value.clone()),
                StaticArgSpec::OperandInt => {
                    let value = inv.operand.take_int("bootstrap argument")?;
                    let value = i32::try_from(value).map_err(|_| {
                        ExpandError::malformed(format!("bootstrap argument {value} does not fit in 32 bits"))
                    })?;
                    static_args.push(StaticArg::Int(value));
                }
                StaticArgSpec::OperandHandles => {
                    for field in inv.operand.take_all() {
                        static_args.push(StaticArg::MethodHandle(field.to_string()));
                    }
                }
            }
        }

        let id = CallSiteId(self.next_call_site);
        self.next_call_site += 1;
        Ok(BootstrapCallSite {
            id,
            name: spec.name.to_string(),
            descriptor,
            bootstrap_owner: spec.bootstrap.owner.to_string(),
            bootstrap_method: spec.bootstrap.method.to_string(),
            bootstrap_descriptor: spec.bootstrap.descriptor(),
            static_args,
        })
    }
}

fn target_insn<'a>(library: &'a MacroLibrary, opcode: &str) -> Result<&'a TargetInsn, ExpandError> {
    library
        .isa()
        .lookup(opcode)
        .ok_or_else(|| ExpandError::malformed(format!("unknown target instruction '{opcode}'")))
}

/// Value type of the current invocation: declared by the entry, or taken
/// once from a leading type annotation field.
fn resolve_type(inv: &mut Invocation, declared: Option<ValueType>) -> Result<ValueType, ExpandError> {
    if let Some(value_type) = declared.or(inv.annotated) {
        return Ok(value_type);
    }
    let parsed = inv
        .operand
        .first()
        .and_then(Field::as_text)
        .and_then(ValueType::parse_annotation)
        .ok_or_else(|| ExpandError::malformed("missing value type annotation (I32, I64, F32 or F64)"))?;
    inv.operand.take();
    inv.annotated = Some(parsed);
    Ok(parsed)
}

fn take_depth(operand: &mut OperandText) -> Result<usize, ExpandError> {
    let depth = operand.take_int("branch depth")?;
    usize::try_from(depth).map_err(|_| ExpandError::malformed(format!("branch depth {depth} is negative")))
}

fn leftover_check(operand: &OperandText) -> Result<(), ExpandError> {
    if operand.is_empty() {
        return Ok(());
    }
    let rest: Vec<String> = operand.fields().iter().map(|field| field.to_string()).collect();
    Err(ExpandError::malformed(format!("unexpected operand(s): {}", rest.join(" "))))
}
