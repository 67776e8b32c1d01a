// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Structured control state for one translation unit.
//!
//! The tracker owns the nesting stack of open constructs, the monotonic
//! label counter and the listing indentation level. It is the single source
//! of truth for which label a structured branch resolves to.

use std::fmt;

use crate::core::error::{ExpandError, ExpandErrorKind};

/// Unit-scoped generated label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@L{}", self.0)
    }
}

/// Label operand: generated by the tracker or written in source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabelRef {
    Generated(Label),
    Named(String),
}

impl fmt::Display for LabelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated(label) => write!(f, "{label}"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Kind of an open construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Block,
    Loop,
    If,
    Else,
}

impl FrameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Loop => "loop",
            Self::If => "if",
            Self::Else => "else",
        }
    }
}

/// One open construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub exit: Label,
    /// Backward branch target of a loop.
    pub entry: Option<Label>,
    /// Else label of an `If` not yet resolved by `Else` or `End`.
    pub pending_else: Option<Label>,
    /// Mnemonic that opened the construct.
    pub opener: String,
    pub indent: usize,
}

impl Frame {
    /// Label a branch to this frame resolves to.
    pub fn branch_target(&self) -> Label {
        match self.entry {
            Some(entry) if self.kind == FrameKind::Loop => entry,
            _ => self.exit,
        }
    }
}

/// Nesting stack, label counter and indentation for one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlTracker {
    frames: Vec<Frame>,
    next_label: u32,
    indent: usize,
}

impl ControlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose first generated label is `first`.
    pub fn starting_at(first: u32) -> Self {
        Self {
            next_label: first,
            ..Self::default()
        }
    }

    pub fn alloc_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn labels_allocated(&self) -> u32 {
        self.next_label
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_balanced(&self) -> bool {
        self.frames.is_empty() && self.indent == 0
    }

    fn push(&mut self, kind: FrameKind, opener: &str) -> &Frame {
        let exit = self.alloc_label();
        let entry = (kind == FrameKind::Loop).then(|| self.alloc_label());
        let pending_else = (kind == FrameKind::If).then(|| self.alloc_label());
        self.frames.push(Frame {
            kind,
            exit,
            entry,
            pending_else,
            opener: opener.to_string(),
            indent: self.indent,
        });
        self.indent += 1;
        &self.frames[self.frames.len() - 1]
    }

    /// Open a block; returns its exit label.
    pub fn open_block(&mut self, opener: &str) -> Label {
        self.push(FrameKind::Block, opener).exit
    }

    /// Open a loop; returns its entry label, defined at the current position.
    pub fn open_loop(&mut self, opener: &str) -> Label {
        let frame = self.push(FrameKind::Loop, opener);
        frame.entry.unwrap_or(frame.exit)
    }

    /// Open an if; returns the label the inverted condition jumps to.
    pub fn open_if(&mut self, opener: &str) -> Label {
        let frame = self.push(FrameKind::If, opener);
        frame.pending_else.unwrap_or(frame.exit)
    }

    /// Switch the innermost `If` to its else arm.
    ///
    /// Returns `(exit, else_label)`: the then-arm jumps to `exit`, and
    /// `else_label` is defined at the current position.
    pub fn enter_else(&mut self) -> Result<(Label, Label), ExpandError> {
        let frame = match self.frames.last_mut() {
            Some(frame) if frame.kind == FrameKind::If => frame,
            Some(frame) => {
                return Err(ExpandError::unbalanced(format!(
                    "else inside {} opened by {}; expected an open if",
                    frame.kind.as_str(),
                    frame.opener
                )))
            }
            None => return Err(ExpandError::unbalanced("else without an open if")),
        };
        let else_label = frame
            .pending_else
            .take()
            .ok_or_else(|| ExpandError::unbalanced("if already has an else arm"))?;
        frame.kind = FrameKind::Else;
        self.indent = frame.indent + 1;
        Ok((frame.exit, else_label))
    }

    /// Pop the innermost construct. The caller defines its pending else
    /// label, then its exit label, at the current position.
    pub fn close(&mut self) -> Result<Frame, ExpandError> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| ExpandError::unbalanced("end without an open construct"))?;
        self.indent = frame.indent;
        Ok(frame)
    }

    /// Label for a structured branch `depth` frames out (0 = innermost).
    pub fn branch_target(&self, depth: usize) -> Result<Label, ExpandError> {
        let open = self.frames.len();
        if depth >= open {
            return Err(ExpandError::new(
                ExpandErrorKind::InvalidBranchDepth,
                format!("branch depth {depth} but only {open} construct(s) open"),
            ));
        }
        Ok(self.frames[open - 1 - depth].branch_target())
    }

    /// End-of-unit check: every construct closed, indentation back to zero.
    pub fn finish(&self) -> Result<(), Vec<ExpandError>> {
        if self.is_balanced() {
            return Ok(());
        }
        let mut errors: Vec<ExpandError> = self
            .frames
            .iter()
            .map(|frame| {
                ExpandError::unbalanced(format!(
                    "{} is never closed",
                    frame.kind.as_str()
                ))
                .with_mnemonic(&frame.opener)
            })
            .collect();
        if errors.is_empty() {
            errors.push(ExpandError::unbalanced(format!(
                "indentation ends at level {}",
                self.indent
            )));
        }
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn block_exit_and_loop_entry_are_branch_targets() {
        let mut tracker = ControlTracker::new();
        let exit = tracker.open_block("BLOCK");
        let entry = tracker.open_loop("LOOP");
        assert_eq!(tracker.branch_target(0).expect("loop"), entry);
        assert_eq!(tracker.branch_target(1).expect("block"), exit);
        assert_eq!(
            tracker.branch_target(2).unwrap_err().kind(),
            ExpandErrorKind::InvalidBranchDepth
        );
    }

    #[test]
    fn else_requires_if_on_top() {
        let mut tracker = ControlTracker::new();
        tracker.open_block("BLOCK");
        let err = tracker.enter_else().unwrap_err();
        assert_eq!(err.kind(), ExpandErrorKind::UnbalancedControlConstruct);
        assert!(err.message().contains("BLOCK"));
    }

    #[test]
    fn else_reuses_exit_and_restores_indent() {
        let mut tracker = ControlTracker::new();
        tracker.open_block("BLOCK");
        let else_label = tracker.open_if("IF");
        assert_eq!(tracker.indent(), 2);
        let exit = tracker.top().expect("if").exit;
        assert_eq!(tracker.enter_else().expect("else"), (exit, else_label));
        assert_eq!(tracker.indent(), 2);
        assert!(tracker.enter_else().is_err());
        let frame = tracker.close().expect("end");
        assert_eq!(frame.pending_else, None);
        assert_eq!(frame.exit, exit);
        assert_eq!(tracker.indent(), 1);
    }

    #[test]
    fn leftover_frames_name_their_opener() {
        let mut tracker = ControlTracker::new();
        tracker.open_loop("LOOP");
        let errors = tracker.finish().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].mnemonic(), Some("LOOP"));
    }

    #[test]
    fn end_on_empty_stack_is_unbalanced() {
        let mut tracker = ControlTracker::new();
        assert_eq!(
            tracker.close().unwrap_err().kind(),
            ExpandErrorKind::UnbalancedControlConstruct
        );
    }

    #[derive(Debug, Clone)]
    enum Step {
        Open(u8),
        Else,
        End,
        Branch(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0u8..3).prop_map(Step::Open),
            Just(Step::Else),
            Just(Step::End),
            (0usize..6).prop_map(Step::Branch),
        ]
    }

    proptest! {
        #[test]
        fn balanced_sequences_return_to_zero(steps in proptest::collection::vec(step(), 0..40)) {
            let mut tracker = ControlTracker::new();
            let mut model: Vec<bool> = Vec::new();
            for step in steps {
                match step {
                    Step::Open(kind) => {
                        match kind {
                            0 => { tracker.open_block("BLOCK"); }
                            1 => { tracker.open_loop("LOOP"); }
                            _ => { tracker.open_if("IF"); }
                        }
                        model.push(kind == 2);
                    }
                    Step::Else => {
                        let ok = model.last() == Some(&true);
                        prop_assert_eq!(tracker.enter_else().is_ok(), ok);
                        if ok {
                            if let Some(top) = model.last_mut() {
                                *top = false;
                            }
                        }
                    }
                    Step::End => {
                        prop_assert_eq!(tracker.close().is_ok(), model.pop().is_some());
                    }
                    Step::Branch(depth) => {
                        prop_assert_eq!(tracker.branch_target(depth).is_ok(), depth < model.len());
                    }
                }
                prop_assert_eq!(tracker.depth(), model.len());
                prop_assert_eq!(tracker.indent(), model.len());
            }
            while tracker.close().is_ok() {}
            prop_assert!(tracker.finish().is_ok());
        }
    }
}
