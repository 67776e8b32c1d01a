// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Library-independent expansion core.

pub mod descriptor;
pub mod dyncall;
pub mod emit;
pub mod engine;
pub mod error;
pub mod library;
pub mod op;
pub mod registry;
pub mod target;
pub mod tokens;
pub mod tracker;
