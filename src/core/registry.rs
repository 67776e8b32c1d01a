// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Registry of named macro libraries.
//!
//! The registry has no knowledge of concrete libraries. Library modules
//! provide a name, aliases and a builder; each library is built and
//! validated once, on first request, and then shared read-only.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::core::error::ConfigError;
use crate::core::library::MacroLibrary;

/// Registration interface for one macro library.
pub trait LibraryModule: Send + Sync {
    fn library_name(&self) -> &'static str;
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }
    fn description(&self) -> &'static str;
    fn build(&self) -> Result<MacroLibrary, ConfigError>;
}

/// Error returned when a library cannot be provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    UnknownLibrary(String),
    Load(ConfigError),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLibrary(name) => write!(f, "no macro library registered as '{name}'"),
            Self::Load(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RegistryError {}

struct Registered {
    module: Box<dyn LibraryModule>,
    built: OnceLock<Result<Arc<MacroLibrary>, ConfigError>>,
}

/// Central registry mapping library names and aliases to modules.
pub struct LibraryRegistry {
    libraries: Vec<Registered>,
    names: HashMap<String, usize>,
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self {
            libraries: Vec::new(),
            names: HashMap::new(),
        }
    }

    pub fn register(&mut self, module: Box<dyn LibraryModule>) {
        let index = self.libraries.len();
        self.names
            .insert(normalize_library_name(module.library_name()), index);
        for alias in module.aliases() {
            self.names.insert(normalize_library_name(alias), index);
        }
        self.libraries.push(Registered {
            module,
            built: OnceLock::new(),
        });
    }

    /// Canonical name for a library name or alias.
    pub fn resolve_name(&self, name: &str) -> Option<&'static str> {
        self.names
            .get(&normalize_library_name(name))
            .map(|index| self.libraries[*index].module.library_name())
    }

    /// Canonical library names in registration order.
    pub fn library_names(&self) -> Vec<&'static str> {
        self.libraries
            .iter()
            .map(|registered| registered.module.library_name())
            .collect()
    }

    pub fn description(&self, name: &str) -> Option<&'static str> {
        self.names
            .get(&normalize_library_name(name))
            .map(|index| self.libraries[*index].module.description())
    }

    /// Build (once) and return the library registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<MacroLibrary>, RegistryError> {
        let index = self
            .names
            .get(&normalize_library_name(name))
            .copied()
            .ok_or_else(|| RegistryError::UnknownLibrary(name.to_string()))?;
        let registered = &self.libraries[index];
        registered
            .built
            .get_or_init(|| registered.module.build().map(Arc::new))
            .clone()
            .map_err(RegistryError::Load)
    }
}

fn normalize_library_name(name: &str) -> String {
    name.to_ascii_lowercase()
}
