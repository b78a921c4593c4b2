//! Hierarchical scopes binding identifiers to operators, proofs and
//! sub-scopes
//!
//! A scope inherits its settings from its parent at creation time; later
//! `setting` updates stay local. Bindings are write-once. Intermediate
//! predicates created during verification are attached to the owning scope
//! under generated `VARi` names.

use crate::linalg::{self, C64};
use crate::operators::Operator;
use crate::program::NamedPredicate;
use crate::verifier::ProofRecord;
use miette::Diagnostic;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum ScopeError {
    #[error("The variable '{name}' is not defined")]
    #[diagnostic(code(nqpv::scope::undefined))]
    Undefined { name: String },

    #[error("The variable '{name}' already exists in scope '{scope}'")]
    #[diagnostic(code(nqpv::scope::rebinding))]
    Rebinding { name: String, scope: String },

    #[error("'{name}' is not a scope and cannot be used as a path prefix")]
    #[diagnostic(code(nqpv::scope::not_a_scope))]
    NotAScope { name: String },

    #[error("Unknown setting key '{key}'")]
    #[diagnostic(
        code(nqpv::scope::setting),
        help("valid keys are EPS, SDP_PRECISION, SILENT, IDENTICAL_VAR_CHECK, OPT_PRESERVING")
    )]
    UnknownSetting { key: String },

    #[error("Setting '{key}' expects a {expected} value")]
    #[diagnostic(code(nqpv::scope::setting))]
    BadSettingValue { key: String, expected: &'static str },
}

/// Per-scope settings, inherited by subscopes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub eps: f64,
    pub sdp_precision: f64,
    pub silent: bool,
    pub identical_var_check: bool,
    pub opt_preserving: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            eps: 1e-7,
            sdp_precision: 1e-9,
            silent: false,
            identical_var_check: true,
            opt_preserving: false,
        }
    }
}

/// A value for a `setting` command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    Float(f64),
    Bool(bool),
}

/// A bound value
#[derive(Clone)]
pub enum Binding {
    Operator(Rc<Operator>),
    Predicate(Rc<NamedPredicate>),
    Proof(Rc<ProofRecord>),
    Scope(Scope),
}

impl Binding {
    pub fn kind(&self) -> &'static str {
        match self {
            Binding::Operator(_) => "operator",
            Binding::Predicate(_) => "predicate",
            Binding::Proof(_) => "proof",
            Binding::Scope(_) => "scope",
        }
    }
}

struct ScopeData {
    label: String,
    parent: Option<Weak<RefCell<ScopeData>>>,
    bindings: HashMap<String, Binding>,
    /// insertion order, for listings
    names: Vec<String>,
    settings: Settings,
    auto_counter: u32,
}

/// A shared handle to one scope node
#[derive(Clone)]
pub struct Scope {
    inner: Rc<RefCell<ScopeData>>,
}

const AUTO_PREFIX: &str = "VAR";

impl Scope {
    pub fn root(label: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ScopeData {
                label: label.to_string(),
                parent: None,
                bindings: HashMap::new(),
                names: Vec::new(),
                settings: Settings::default(),
                auto_counter: 0,
            })),
        }
    }

    /// Create a sub-scope inheriting the current settings
    pub fn child(&self, label: &str) -> Self {
        let settings = self.settings();
        Self {
            inner: Rc::new(RefCell::new(ScopeData {
                label: label.to_string(),
                parent: Some(Rc::downgrade(&self.inner)),
                bindings: HashMap::new(),
                names: Vec::new(),
                settings,
                auto_counter: 0,
            })),
        }
    }

    pub fn label(&self) -> String {
        self.inner.borrow().label.clone()
    }

    /// Fully qualified prefix, e.g. `global.sub.`
    pub fn prefix(&self) -> String {
        let data = self.inner.borrow();
        match data.parent.as_ref().and_then(|w| w.upgrade()) {
            Some(parent) => {
                let parent = Scope { inner: parent };
                format!("{}{}.", parent.prefix(), data.label)
            }
            None => format!("{}.", data.label),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner.borrow().settings
    }

    /// Apply a `setting` command to this scope
    pub fn set_setting(&self, key: &str, value: SettingValue) -> Result<(), ScopeError> {
        let mut data = self.inner.borrow_mut();
        let s = &mut data.settings;
        match (key, value) {
            ("EPS", SettingValue::Float(v)) => s.eps = v,
            ("SDP_PRECISION", SettingValue::Float(v)) => s.sdp_precision = v,
            ("SILENT", SettingValue::Bool(v)) => s.silent = v,
            ("IDENTICAL_VAR_CHECK", SettingValue::Bool(v)) => s.identical_var_check = v,
            ("OPT_PRESERVING", SettingValue::Bool(v)) => s.opt_preserving = v,
            ("EPS" | "SDP_PRECISION", _) => {
                return Err(ScopeError::BadSettingValue {
                    key: key.to_string(),
                    expected: "float",
                })
            }
            ("SILENT" | "IDENTICAL_VAR_CHECK" | "OPT_PRESERVING", _) => {
                return Err(ScopeError::BadSettingValue {
                    key: key.to_string(),
                    expected: "boolean",
                })
            }
            _ => {
                return Err(ScopeError::UnknownSetting {
                    key: key.to_string(),
                })
            }
        }
        if s.eps < s.sdp_precision {
            tracing::warn!(
                eps = s.eps,
                sdp_precision = s.sdp_precision,
                "EPS is tighter than SDP_PRECISION; true entailments may be reported false"
            );
        }
        Ok(())
    }

    /// Bind a value in this scope. Write-once per identifier.
    pub fn bind(&self, name: &str, value: Binding) -> Result<(), ScopeError> {
        let mut data = self.inner.borrow_mut();
        if data.bindings.contains_key(name) {
            return Err(ScopeError::Rebinding {
                name: name.to_string(),
                scope: data.label.clone(),
            });
        }
        data.bindings.insert(name.to_string(), value);
        data.names.push(name.to_string());
        Ok(())
    }

    /// Remove a local binding (used to discard intermediates)
    pub fn remove(&self, name: &str) {
        let mut data = self.inner.borrow_mut();
        data.bindings.remove(name);
        data.names.retain(|n| n != name);
    }

    /// Is the name visible from this scope (walking parents)?
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up a name, walking to the root
    pub fn get(&self, name: &str) -> Option<Binding> {
        let data = self.inner.borrow();
        if let Some(b) = data.bindings.get(name) {
            return Some(b.clone());
        }
        let parent = data.parent.as_ref().and_then(|w| w.upgrade())?;
        drop(data);
        Scope { inner: parent }.get(name)
    }

    /// Look up a name locally only (no parent walk)
    pub fn get_local(&self, name: &str) -> Option<Binding> {
        self.inner.borrow().bindings.get(name).cloned()
    }

    /// Resolve a dotted path. The first segment walks to the root; each
    /// later segment restarts lookup inside the named sub-scope and never
    /// crosses into a sibling.
    pub fn resolve_path(&self, path: &[String]) -> Result<Binding, ScopeError> {
        let (first, rest) = path.split_first().expect("empty path");
        let mut current = self.get(first).ok_or_else(|| ScopeError::Undefined {
            name: first.clone(),
        })?;
        let mut walked = first.clone();
        for seg in rest {
            let scope = match &current {
                Binding::Scope(s) => s.clone(),
                _ => return Err(ScopeError::NotAScope { name: walked }),
            };
            current = scope
                .get_local(seg)
                .ok_or_else(|| ScopeError::Undefined {
                    name: format!("{}.{}", walked, seg),
                })?;
            walked = format!("{}.{}", walked, seg);
        }
        Ok(current)
    }

    /// Names bound locally, in insertion order
    pub fn local_names(&self) -> Vec<String> {
        self.inner.borrow().names.clone()
    }

    /// A fresh generated name, disjoint from every visible binding
    pub fn auto_name(&self) -> String {
        loop {
            let n = {
                let mut data = self.inner.borrow_mut();
                let n = data.auto_counter;
                data.auto_counter += 1;
                n
            };
            let candidate = format!("{}{}", AUTO_PREFIX, n);
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Find a visible operator binding structurally equal to `mat`
    pub fn find_equal_operator(&self, mat: &DMatrix<C64>, eps: f64) -> Option<String> {
        let data = self.inner.borrow();
        for name in &data.names {
            if let Some(Binding::Operator(op)) = data.bindings.get(name) {
                if let Operator::Single(m) = op.as_ref() {
                    if linalg::approx_eq(m, mat, eps) {
                        return Some(name.clone());
                    }
                }
            }
        }
        let parent = data.parent.as_ref().and_then(|w| w.upgrade())?;
        drop(data);
        Scope { inner: parent }.find_equal_operator(mat, eps)
    }

    /// Offer a freshly computed Hermitian to the scope: reuse the name of a
    /// structurally equal operator when `IDENTICAL_VAR_CHECK` is on,
    /// otherwise issue a generated name. Returns the name and whether a new
    /// binding was created.
    pub fn offer_operator(&self, mat: DMatrix<C64>) -> (String, bool) {
        let settings = self.settings();
        if settings.identical_var_check {
            if let Some(name) = self.find_equal_operator(&mat, settings.eps) {
                return (name, false);
            }
        }
        let name = self.auto_name();
        self.bind(&name, Binding::Operator(Rc::new(Operator::Single(mat))))
            .expect("generated names are never taken");
        (name, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_once() {
        let scope = Scope::root("global");
        let op = Rc::new(Operator::Single(linalg::eye(1)));
        scope.bind("I", Binding::Operator(op.clone())).unwrap();
        assert!(matches!(
            scope.bind("I", Binding::Operator(op)),
            Err(ScopeError::Rebinding { .. })
        ));
    }

    #[test]
    fn test_lookup_walks_to_root() {
        let root = Scope::root("global");
        let op = Rc::new(Operator::Single(linalg::eye(1)));
        root.bind("X", Binding::Operator(op)).unwrap();
        let child = root.child("inner");
        assert!(child.contains("X"));
        assert!(!root.child("other").contains("Y"));
    }

    #[test]
    fn test_settings_inherited_then_local() {
        let root = Scope::root("global");
        root.set_setting("EPS", SettingValue::Float(1e-5)).unwrap();
        let child = root.child("inner");
        assert_eq!(child.settings().eps, 1e-5);
        child.set_setting("EPS", SettingValue::Float(1e-3)).unwrap();
        assert_eq!(child.settings().eps, 1e-3);
        assert_eq!(root.settings().eps, 1e-5);
    }

    #[test]
    fn test_setting_type_mismatch() {
        let root = Scope::root("global");
        assert!(root.set_setting("SILENT", SettingValue::Float(1.0)).is_err());
        assert!(root.set_setting("NO_SUCH_KEY", SettingValue::Bool(true)).is_err());
    }

    #[test]
    fn test_path_resolution_stays_in_subscope() {
        let root = Scope::root("global");
        let sub = root.child("sub");
        let op = Rc::new(Operator::Single(linalg::eye(1)));
        root.bind("top_only", Binding::Operator(op.clone())).unwrap();
        sub.bind("inner_op", Binding::Operator(op)).unwrap();
        root.bind("sub", Binding::Scope(sub)).unwrap();

        assert!(root
            .resolve_path(&["sub".into(), "inner_op".into()])
            .is_ok());
        // paths never fall back to the parent once inside a sub-scope
        assert!(root
            .resolve_path(&["sub".into(), "top_only".into()])
            .is_err());
    }

    #[test]
    fn test_auto_names_avoid_user_bindings() {
        let scope = Scope::root("global");
        let op = Rc::new(Operator::Single(linalg::eye(1)));
        scope.bind("VAR0", Binding::Operator(op)).unwrap();
        let name = scope.auto_name();
        assert_ne!(name, "VAR0");
    }

    #[test]
    fn test_offer_reuses_structural_equal() {
        let scope = Scope::root("global");
        let (first, created) = scope.offer_operator(linalg::ket0_proj());
        assert!(created);
        let (second, created_again) = scope.offer_operator(linalg::ket0_proj());
        assert!(!created_again);
        assert_eq!(first, second);
    }

    #[test]
    fn test_offer_respects_identical_var_check_off() {
        let scope = Scope::root("global");
        scope
            .set_setting("IDENTICAL_VAR_CHECK", SettingValue::Bool(false))
            .unwrap();
        let (a, _) = scope.offer_operator(linalg::ket0_proj());
        let (b, _) = scope.offer_operator(linalg::ket0_proj());
        assert_ne!(a, b);
    }
}
