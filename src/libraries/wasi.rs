// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The wasm table plus string stores into linear memory.

use crate::core::error::ConfigError;
use crate::core::library::{LibraryBuilder, MacroLibrary};
use crate::core::registry::LibraryModule;
use crate::libraries::jvm::JVM_ISA;
use crate::libraries::wasm::{self, dyn_storage};

pub const WASI_LIBRARY_NAME: &str = "wasi";

const STRING_STORES: &[(&str, &str)] = &[
    ("STRING_STORE_SIZED", "putSizedString"),
    ("STRING_STORE_C", "putCString"),
    ("STRING_STORE", "putString"),
];

pub fn build_wasi_library() -> Result<MacroLibrary, ConfigError> {
    let mut builder = LibraryBuilder::new(WASI_LIBRARY_NAME, &JVM_ISA);
    wasm::register(&mut builder);
    for &(name, method) in STRING_STORES {
        builder.external(name, vec![dyn_storage(method, "(ILjava/lang/String;)V")]);
    }
    builder.build()
}

pub struct WasiLibrary;

impl LibraryModule for WasiLibrary {
    fn library_name(&self) -> &'static str {
        WASI_LIBRARY_NAME
    }

    fn description(&self) -> &'static str {
        "wasm32MVP with string stores for WASI trampolines"
    }

    fn build(&self) -> Result<MacroLibrary, ConfigError> {
        build_wasi_library()
    }
}
