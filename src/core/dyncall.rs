// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Dynamic-call site synthesis.
//!
//! A `DynCallSpec` is the static, table-side description of a call site
//! linked on first use through a bootstrap method. Expanding it produces a
//! `BootstrapCallSite`, which is immutable and owned by the one primitive
//! that carries it.

use std::collections::HashMap;
use std::fmt;

use crate::core::descriptor::{parse_method_descriptor, parse_type_list, ParmTable};

pub const METHOD_HANDLE_DESC: &str = "Ljava/lang/invoke/MethodHandle;";
pub const STRING_DESC: &str = "Ljava/lang/String;";

/// Leading bootstrap parameters every bootstrap method receives.
const BOOTSTRAP_PREFIX: &str =
    "Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;";
const BOOTSTRAP_RESULT: &str = "Ljava/lang/invoke/CallSite;";

/// Typed literal passed to a bootstrap method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticArg {
    Int(i32),
    String(String),
    MethodHandle(String),
}

impl StaticArg {
    fn accepts(&self, desc: &str) -> bool {
        match self {
            Self::Int(_) => desc == "I",
            Self::String(_) => desc == STRING_DESC,
            Self::MethodHandle(_) => desc == METHOD_HANDLE_DESC,
        }
    }
}

impl fmt::Display for StaticArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::MethodHandle(handle) => write!(f, "{handle}"),
        }
    }
}

/// Where one bootstrap static argument comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticArgSpec {
    Fixed(StaticArg),
    /// Int literal consumed from the operand text.
    OperandInt,
    /// Every remaining operand field, as method handles (array parameter).
    OperandHandles,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSpec {
    pub owner: &'static str,
    pub method: &'static str,
    /// Descriptor of the extra parameters after the standard prefix.
    pub extra_params: &'static str,
    pub static_args: Vec<StaticArgSpec>,
}

impl BootstrapSpec {
    pub fn descriptor(&self) -> String {
        format!(
            "({BOOTSTRAP_PREFIX}{}){BOOTSTRAP_RESULT}",
            self.extra_params
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynCallSpec {
    pub name: &'static str,
    /// Fixed descriptor template; `None` takes the descriptor from the
    /// first operand field at expansion time.
    pub descriptor: Option<&'static str>,
    pub bootstrap: BootstrapSpec,
}

impl DynCallSpec {
    /// Call site whose bootstrap takes no extra arguments.
    pub fn of(
        name: &'static str,
        descriptor: Option<&'static str>,
        owner: &'static str,
        method: &'static str,
    ) -> Self {
        Self::with_boot_parms(name, descriptor, owner, method, "", Vec::new())
    }

    pub fn with_boot_parms(
        name: &'static str,
        descriptor: Option<&'static str>,
        owner: &'static str,
        method: &'static str,
        extra_params: &'static str,
        static_args: Vec<StaticArgSpec>,
    ) -> Self {
        Self {
            name,
            descriptor,
            bootstrap: BootstrapSpec {
                owner,
                method,
                extra_params,
                static_args,
            },
        }
    }

    /// Descriptor template after parameter translation, if it is well formed.
    pub fn resolved_descriptor(&self, parms: Option<&ParmTable>) -> Option<String> {
        let template = self.descriptor?;
        let desc = match parms {
            Some(table) => table.translate(template),
            None => template.to_string(),
        };
        parse_method_descriptor(&desc).map(|_| desc.clone())
    }

    /// Load-time check: template satisfiable and static args matching the
    /// bootstrap's extra parameter types.
    pub fn validate(&self, parms: Option<&ParmTable>) -> Result<(), DynCallSpecError> {
        if let Some(template) = self.descriptor {
            if self.resolved_descriptor(parms).is_none() {
                return Err(DynCallSpecError::Template(template.to_string()));
            }
        }
        let params = parse_type_list(self.bootstrap.extra_params).ok_or_else(|| {
            DynCallSpecError::Bootstrap(format!(
                "malformed extra parameter descriptor '{}'",
                self.bootstrap.extra_params
            ))
        })?;
        let args = &self.bootstrap.static_args;
        if params.len() != args.len() {
            return Err(DynCallSpecError::Bootstrap(format!(
                "{} extra parameter(s) but {} static argument(s)",
                params.len(),
                args.len()
            )));
        }
        for (idx, (param, arg)) in params.iter().zip(args).enumerate() {
            let ok = match arg {
                StaticArgSpec::Fixed(value) => value.accepts(param),
                StaticArgSpec::OperandInt => *param == "I",
                StaticArgSpec::OperandHandles => {
                    idx + 1 == params.len() && *param == "[Ljava/lang/invoke/MethodHandle;"
                }
            };
            if !ok {
                return Err(DynCallSpecError::Bootstrap(format!(
                    "argument {} does not match parameter type {param}",
                    idx + 1
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynCallSpecError {
    Template(String),
    Bootstrap(String),
}

/// Identity of one synthesized call site within a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapCallSite {
    pub id: CallSiteId,
    pub name: String,
    pub descriptor: String,
    pub bootstrap_owner: String,
    pub bootstrap_method: String,
    pub bootstrap_descriptor: String,
    pub static_args: Vec<StaticArg>,
}

impl BootstrapCallSite {
    /// Equal apart from call-site identity.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.name == other.name
            && self.descriptor == other.descriptor
            && self.bootstrap_owner == other.bootstrap_owner
            && self.bootstrap_method == other.bootstrap_method
            && self.bootstrap_descriptor == other.bootstrap_descriptor
            && self.static_args == other.static_args
    }
}

impl fmt::Display for BootstrapCallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invokedynamic {}{} {}/{}{}",
            self.name,
            self.descriptor,
            self.bootstrap_owner,
            self.bootstrap_method,
            self.bootstrap_descriptor
        )?;
        if !self.static_args.is_empty() {
            let args: Vec<String> = self.static_args.iter().map(|arg| arg.to_string()).collect();
            write!(f, " {{ {} }}", args.join(" , "))?;
        }
        Ok(())
    }
}

/// Host-side model of first-use linkage: the bootstrap runs once per call
/// site and every later invocation reuses the linked handle.
#[derive(Debug)]
pub struct CallSiteCache<H> {
    linked: HashMap<CallSiteId, H>,
}

impl<H> Default for CallSiteCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> CallSiteCache<H> {
    pub fn new() -> Self {
        Self {
            linked: HashMap::new(),
        }
    }

    pub fn link<F>(&mut self, site: &BootstrapCallSite, bootstrap: F) -> &H
    where
        F: FnOnce(&BootstrapCallSite) -> H,
    {
        self.linked
            .entry(site.id)
            .or_insert_with(|| bootstrap(site))
    }

    pub fn is_linked(&self, id: CallSiteId) -> bool {
        self.linked.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.linked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_spec(desc: &'static str) -> DynCallSpec {
        DynCallSpec::with_boot_parms(
            "loadInt",
            Some(desc),
            "wasmrun/Storage",
            "storageBootstrap",
            "Ljava/lang/invoke/MethodHandle;I",
            vec![
                StaticArgSpec::Fixed(StaticArg::MethodHandle("GS:mem()Lwasmrun/Storage;".into())),
                StaticArgSpec::OperandInt,
            ],
        )
    }

    #[test]
    fn valid_spec_passes_validation() {
        assert_eq!(storage_spec("(I)I").validate(None), Ok(()));
    }

    #[test]
    fn unsatisfiable_template_is_rejected() {
        let err = storage_spec("(I32)I").validate(None).unwrap_err();
        assert_eq!(err, DynCallSpecError::Template("(I32)I".to_string()));
    }

    #[test]
    fn argument_count_must_match_extra_params() {
        let mut spec = storage_spec("(I)I");
        spec.bootstrap.static_args.pop();
        assert!(matches!(
            spec.validate(None),
            Err(DynCallSpecError::Bootstrap(_))
        ));
    }

    #[test]
    fn argument_kind_must_match_param_type() {
        let mut spec = storage_spec("(I)I");
        spec.bootstrap.static_args[0] = StaticArgSpec::Fixed(StaticArg::Int(3));
        assert!(spec.validate(None).is_err());
    }

    #[test]
    fn bootstrap_descriptor_has_standard_prefix() {
        let spec = storage_spec("(I)I");
        assert_eq!(
            spec.bootstrap.descriptor(),
            "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;I)Ljava/lang/invoke/CallSite;"
        );
    }

    #[test]
    fn cache_runs_bootstrap_once_per_site() {
        let site = BootstrapCallSite {
            id: CallSiteId(0),
            name: "invokeExact".into(),
            descriptor: "(I)I".into(),
            bootstrap_owner: "wasmrun/Table".into(),
            bootstrap_method: "callIndirectBootstrapMH".into(),
            bootstrap_descriptor: String::new(),
            static_args: Vec::new(),
        };
        let other = BootstrapCallSite {
            id: CallSiteId(1),
            ..site.clone()
        };
        let mut cache = CallSiteCache::new();
        let mut runs = 0;
        let first = *cache.link(&site, |_| {
            runs += 1;
            100
        });
        let again = *cache.link(&site, |_| {
            runs += 1;
            200
        });
        assert_eq!((first, again), (100, 100));
        assert_eq!(runs, 1);
        cache.link(&other, |_| 300);
        assert_eq!(cache.len(), 2);
        assert!(cache.is_linked(CallSiteId(1)));
        assert!(site.same_shape(&other));
    }
}
