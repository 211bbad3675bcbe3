use std::fmt;
use std::ops::Range;

use crate::expression::{Expression, Identifier};

/// Reserved reference name meaning "the callback failed". Never registered.
pub const CB_FAILED: &str = "CB_FAILED";

/// How a reference is resolved, decided once when the node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// The reserved `CB_FAILED` sentinel.
    CallbackFailed,
    /// Anything else: looked up by name in the symbol registry.
    Named,
}

/// A reference to a sprite group or layout, e.g. `my_group` or `my_switch(1, 2)`.
///
/// The node is in normal form: it is never folded into a constant. Mapping it
/// to a numeric action-set id happens at code generation time, against the
/// registry that exists then.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteGroupRef {
    name: Identifier,
    params: Vec<Expression>,
    span: Range<usize>,
    kind: ReferenceKind,
}

impl SpriteGroupRef {
    pub fn new(name: Identifier, params: Vec<Expression>, span: Range<usize>) -> Self {
        let kind = if name.value == CB_FAILED {
            ReferenceKind::CallbackFailed
        } else {
            ReferenceKind::Named
        };
        SpriteGroupRef {
            name,
            params,
            span,
            kind,
        }
    }

    pub fn name(&self) -> &Identifier {
        &self.name
    }

    pub fn params(&self) -> &[Expression] {
        &self.params
    }

    pub fn span(&self) -> &Range<usize> {
        &self.span
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }
}

impl fmt::Display for SpriteGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            return write!(f, "{}", self.name);
        }
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        write!(f, "{}({})", self.name, params.join(", "))
    }
}
