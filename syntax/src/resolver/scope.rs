//! Lexical scope stack used while resolving.

use std::collections::HashMap;

use crate::ast::DeclKind;

/// Scope map key. The same spelling may be bound once per declaration
/// kind in a single scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclKey {
    pub name: String,
    pub kind: DeclKind,
}

impl DeclKey {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// What a scope knows about one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub kind: DeclKind,
    /// `false` between declaring a name and finishing its initializer.
    pub defined: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Scope {
    bindings: HashMap<DeclKey, Binding>,
}

impl Scope {
    pub(crate) fn get(&self, key: &DeclKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }
}

/// Keys a reference may match, in the order a scope is probed.
/// `None` is the wildcard.
fn candidate_keys(name: &str, kind: Option<DeclKind>) -> Vec<DeclKey> {
    match kind {
        Some(kind) => vec![DeclKey::new(name, kind)],
        None => DeclKind::LOOKUP_ORDER
            .iter()
            .map(|kind| DeclKey::new(name, *kind))
            .collect(),
    }
}

/// Innermost scope is the last element.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
        log::trace!("scope pushed, depth {}", self.scopes.len());
    }

    pub fn pop(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            log::trace!(
                "scope popped with {} binding(s), depth {}",
                scope.len(),
                self.scopes.len()
            );
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Add an undefined binding for `(name, kind)` to the innermost scope.
    ///
    /// Returns the existing binding as the error if that exact key is
    /// already bound there. Does nothing when no scope is open.
    pub fn declare(&mut self, name: &str, kind: DeclKind) -> Result<(), Binding> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        let key = DeclKey::new(name, kind);
        if let Some(existing) = scope.bindings.get(&key) {
            return Err(*existing);
        }
        scope.bindings.insert(
            key,
            Binding {
                kind,
                defined: false,
            },
        );
        Ok(())
    }

    /// Mark `(name, kind)` in the innermost scope as fully initialized.
    pub fn define(&mut self, name: &str, kind: DeclKind) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if let Some(binding) = scope.bindings.get_mut(&DeclKey::new(name, kind)) {
            binding.defined = true;
        }
    }

    /// Bind an implicit name (`this`, `super`) in the innermost scope,
    /// already defined and overwriting any previous entry.
    pub fn inject(&mut self, name: &str, kind: DeclKind) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(
                DeclKey::new(name, kind),
                Binding {
                    kind,
                    defined: true,
                },
            );
        }
    }

    /// Innermost binding matching `name` and `kind`, with its hop distance
    /// from the innermost scope.
    pub fn lookup(
        &self,
        name: &str,
        kind: Option<DeclKind>,
    ) -> Option<(usize, Binding)> {
        let keys = candidate_keys(name, kind);
        self.scopes
            .iter()
            .rev()
            .enumerate()
            .find_map(|(distance, scope)| {
                keys.iter()
                    .find_map(|key| scope.get(key))
                    .map(|binding| (distance, *binding))
            })
    }

    /// `defined` flag of the innermost matching binding, `false` if the
    /// name is bound nowhere.
    pub fn is_defined_anywhere(&self, name: &str, kind: Option<DeclKind>) -> bool {
        self.lookup(name, kind)
            .is_some_and(|(_, binding)| binding.defined)
    }
}
