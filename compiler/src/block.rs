//! Validated sprite replacement blocks.
//!
//! These types are only built by [`crate::validate`]. Every field has been
//! checked, and there are no setters: a validated block cannot be changed
//! or turned back into its raw form.

use std::ops::Range;

use nml::expression::Identifier;
use nml::sprite::SpriteEntry;

/// A pixel-data file named by a string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub span: Range<usize>,
}

/// `replace(start_id[, file])`: overwrite base-set sprites by number.
#[derive(Debug, Clone, PartialEq)]
pub struct IdRangeReplacement {
    start_id: i64,
    source_file: Option<SourceFile>,
    sprites: Vec<SpriteEntry>,
    span: Range<usize>,
}

impl IdRangeReplacement {
    pub(crate) fn new(
        start_id: i64,
        source_file: Option<SourceFile>,
        sprites: Vec<SpriteEntry>,
        span: Range<usize>,
    ) -> Self {
        IdRangeReplacement {
            start_id,
            source_file,
            sprites,
            span,
        }
    }

    pub fn start_id(&self) -> i64 {
        self.start_id
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn sprites(&self) -> &[SpriteEntry] {
        &self.sprites
    }

    pub fn span(&self) -> &Range<usize> {
        &self.span
    }
}

/// `replacenew(type[, file[, offset]])`: replace sprites of a new-feature kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReplacement {
    target_type: Identifier,
    source_file: Option<SourceFile>,
    offset: u16,
    sprites: Vec<SpriteEntry>,
    span: Range<usize>,
}

impl TypeReplacement {
    pub(crate) fn new(
        target_type: Identifier,
        source_file: Option<SourceFile>,
        offset: u16,
        sprites: Vec<SpriteEntry>,
        span: Range<usize>,
    ) -> Self {
        TypeReplacement {
            target_type,
            source_file,
            offset,
            sprites,
            span,
        }
    }

    pub fn target_type(&self) -> &Identifier {
        &self.target_type
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn sprites(&self) -> &[SpriteEntry] {
        &self.sprites
    }

    pub fn span(&self) -> &Range<usize> {
        &self.span
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedBlock {
    IdRange(IdRangeReplacement),
    Type(TypeReplacement),
}

impl ValidatedBlock {
    pub fn span(&self) -> &Range<usize> {
        match self {
            ValidatedBlock::IdRange(block) => block.span(),
            ValidatedBlock::Type(block) => block.span(),
        }
    }
}

impl From<IdRangeReplacement> for ValidatedBlock {
    fn from(block: IdRangeReplacement) -> Self {
        ValidatedBlock::IdRange(block)
    }
}

impl From<TypeReplacement> for ValidatedBlock {
    fn from(block: TypeReplacement) -> Self {
        ValidatedBlock::Type(block)
    }
}
