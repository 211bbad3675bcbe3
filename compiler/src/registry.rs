use std::collections::HashMap;

use log::{debug, trace};
use nml::expression::{CB_FAILED, Identifier, ReferenceKind, SpriteGroupRef};

use crate::error::{CompileError, CompileErrorKind};

/// Numeric id of a compiled sprite group or layout.
pub type ActionSetId = u16;

/// Id reserved for `CB_FAILED`. No registered action set ever gets it.
pub const CB_FAILED_ID: ActionSetId = 0;

/// A named, compiled action set that references can point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet {
    pub id: ActionSetId,
    pub name: String,
}

/// Name → action set table for one compilation unit.
///
/// Declarations register into it first; code generation then only reads it.
#[derive(Debug)]
pub struct SymbolRegistry {
    sets: HashMap<String, ActionSet>,
    next_id: ActionSetId,
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        SymbolRegistry::new()
    }
}

impl SymbolRegistry {
    pub fn new() -> Self {
        SymbolRegistry {
            sets: HashMap::new(),
            next_id: CB_FAILED_ID + 1,
        }
    }

    /// Register `name` under the lowest free id.
    pub fn register(&mut self, name: &Identifier) -> Result<ActionSetId, CompileError> {
        while self.sets.values().any(|set| set.id == self.next_id) {
            self.next_id = self.next_id.checked_add(1).ok_or_else(|| exhausted(name))?;
        }
        let id = self.next_id;
        self.insert(name, id)?;
        self.next_id = self.next_id.checked_add(1).unwrap_or(ActionSetId::MAX);
        Ok(id)
    }

    /// Register `name` under a caller-chosen id.
    pub fn register_with_id(
        &mut self,
        name: &Identifier,
        id: ActionSetId,
    ) -> Result<ActionSetId, CompileError> {
        if id == CB_FAILED_ID {
            return Err(CompileError::new(
                CompileErrorKind::Range {
                    what: format!("action-set id of '{}'", name.value),
                    min: 1,
                    max: i64::from(ActionSetId::MAX),
                    value: i64::from(id),
                },
                name.span.clone(),
            ));
        }
        self.insert(name, id)?;
        Ok(id)
    }

    fn insert(&mut self, name: &Identifier, id: ActionSetId) -> Result<(), CompileError> {
        if name.value == CB_FAILED {
            return Err(CompileError::new(
                CompileErrorKind::ReservedName {
                    name: name.value.clone(),
                },
                name.span.clone(),
            ));
        }
        if self.sets.contains_key(&name.value) {
            return Err(CompileError::new(
                CompileErrorKind::DuplicateName {
                    name: name.value.clone(),
                },
                name.span.clone(),
            ));
        }
        debug!("registered action set '{}' as {}", name.value, id);
        self.sets.insert(
            name.value.clone(),
            ActionSet {
                id,
                name: name.value.clone(),
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ActionSet> {
        self.sets.get(name)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Map a reference to the action-set id it denotes.
    ///
    /// `CB_FAILED` is always [`CB_FAILED_ID`], whatever the table holds.
    /// A name with no registration is an ordinary compile error at the
    /// reference's position.
    pub fn resolve(&self, reference: &SpriteGroupRef) -> Result<ActionSetId, CompileError> {
        match reference.kind() {
            ReferenceKind::CallbackFailed => Ok(CB_FAILED_ID),
            ReferenceKind::Named => {
                let set = self.lookup(&reference.name().value).ok_or_else(|| {
                    CompileError::new(
                        CompileErrorKind::UnresolvedReference {
                            name: reference.name().value.clone(),
                        },
                        reference.span().clone(),
                    )
                    .with_note("sprite groups must be declared before they are referenced")
                })?;
                trace!("resolved '{}' to {}", reference, set.id);
                Ok(set.id)
            }
        }
    }
}

fn exhausted(name: &Identifier) -> CompileError {
    CompileError::new(
        CompileErrorKind::Range {
            what: "number of action sets".into(),
            min: 1,
            max: i64::from(ActionSetId::MAX),
            value: i64::from(ActionSetId::MAX) + 1,
        },
        name.span.clone(),
    )
}

/// Resolution of a reference node to its numeric id.
pub trait ResolveActionId {
    fn resolve_to_action_id(&self, registry: &SymbolRegistry) -> Result<ActionSetId, CompileError>;
}

impl ResolveActionId for SpriteGroupRef {
    fn resolve_to_action_id(&self, registry: &SymbolRegistry) -> Result<ActionSetId, CompileError> {
        registry.resolve(self)
    }
}
