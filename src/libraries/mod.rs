// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shipped target description and macro libraries.

pub mod asm_text;
pub mod extended;
pub mod extension;
pub mod java_calls;
pub mod jvm;
pub mod wasi;
pub mod wasm;
