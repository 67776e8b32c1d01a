// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shared default registry construction for the CLI and embedding hosts.

use crate::core::registry::LibraryRegistry;
use crate::libraries::asm_text::AsmTextLibrary;
use crate::libraries::extension::ExtensionLibrary;
use crate::libraries::wasi::WasiLibrary;
use crate::libraries::wasm::WasmLibrary;

/// Build the default registry of shipped macro libraries.
///
/// The first registered library is the default selection.
pub fn build_default_registry() -> LibraryRegistry {
    let mut registry = LibraryRegistry::new();
    registry.register(Box::new(WasmLibrary));
    registry.register(Box::new(WasiLibrary));
    registry.register(Box::new(AsmTextLibrary));
    registry.register(Box::new(ExtensionLibrary));
    registry
}
