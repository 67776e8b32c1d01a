// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Helper-call, extended and stack-select ops, all invocable directly.

use crate::core::error::ConfigError;
use crate::core::library::{LibraryBuilder, MacroLibrary};
use crate::core::op::Visibility;
use crate::core::registry::LibraryModule;
use crate::libraries::jvm::JVM_ISA;
use crate::libraries::{extended, java_calls};

pub const EXTENSION_LIBRARY_NAME: &str = "extension";

pub fn build_extension_library() -> Result<MacroLibrary, ConfigError> {
    let mut builder = LibraryBuilder::new(EXTENSION_LIBRARY_NAME, &JVM_ISA);
    java_calls::register(&mut builder, Visibility::External);
    extended::register(&mut builder, Visibility::External);
    extended::register_select(&mut builder, Visibility::External);
    builder.build()
}

pub struct ExtensionLibrary;

impl LibraryModule for ExtensionLibrary {
    fn library_name(&self) -> &'static str {
        EXTENSION_LIBRARY_NAME
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["ext"]
    }

    fn description(&self) -> &'static str {
        "platform helper calls, structured control and stack-select ops"
    }

    fn build(&self) -> Result<MacroLibrary, ConfigError> {
        build_extension_library()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_is_external() {
        let library = build_extension_library().expect("extension library");
        assert!(library
            .entries()
            .iter()
            .all(|entry| entry.visibility == Visibility::External));
        assert!(library.lookup("inv_iudiv").is_ok());
        assert!(library.lookup("ext_BR_IF_DCMPLT").is_ok());
        assert!(library.lookup("xxx_popn").is_ok());
        assert!(library.config().options.is_empty());
    }
}
