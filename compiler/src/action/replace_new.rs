//! Action 0x05: replace sprites for new features, by replacement type.
//!
//! Layout: `05 <type> <num-sprites:EB>`, or with an offset
//! `05 <type|0x80> <num-sprites:EB> <offset:EB>`.

use std::collections::HashMap;

use log::debug;
use serde::Deserialize;

use crate::action::{ActionRecord, push_extended_byte};
use crate::block::TypeReplacement;
use crate::error::{CompileError, CompileErrorKind};
use crate::generator::{GenerateActions, GenerationContext};

pub const ACTION_REPLACE_NEW: u8 = 0x05;

/// Set on the type byte when an offset follows the sprite count.
const OFFSET_FLAG: u8 = 0x80;

/// How many sprites a replacement type takes, and whether an offset is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockRule {
    /// Exactly the listed number of sprites, no offset.
    Fixed,
    /// Any number of sprites, no offset.
    Any,
    /// Any number of sprites, optionally starting at an offset.
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplacementType {
    pub code: u8,
    pub sprites: usize,
    pub block: BlockRule,
}

const BUILTIN_TYPES: &[(&str, u8, usize, BlockRule)] = &[
    ("PRE_SIGNAL", 0x04, 48, BlockRule::Offset),
    ("CATENARY", 0x05, 48, BlockRule::Offset),
    ("FOUNDATIONS", 0x06, 74, BlockRule::Offset),
    ("TTDP_GUI", 0x07, 179, BlockRule::Fixed),
    ("CANALS", 0x08, 65, BlockRule::Offset),
    ("ONE_WAY_ROAD", 0x09, 6, BlockRule::Offset),
    ("COLOURMAP_2CC", 0x0A, 256, BlockRule::Offset),
    ("TRAMWAY", 0x0B, 113, BlockRule::Offset),
    ("SNOWY_TEMPERATE_TREES", 0x0C, 133, BlockRule::Fixed),
    ("COAST", 0x0D, 16, BlockRule::Fixed),
    ("NEW_SIGNALS", 0x0E, 512, BlockRule::Any),
    ("TRACKS_FOR_SLOPES", 0x0F, 12, BlockRule::Offset),
    ("AIRPORT_EXTRA", 0x10, 15, BlockRule::Offset),
    ("ROAD_STOP", 0x11, 8, BlockRule::Offset),
    ("AQUEDUCTS", 0x12, 8, BlockRule::Offset),
    ("AUTORAIL", 0x13, 55, BlockRule::Offset),
    ("FLAGS", 0x14, 36, BlockRule::Offset),
    ("OTTD_GUI", 0x15, 162, BlockRule::Offset),
    ("AIRPORT_PREVIEW", 0x16, 9, BlockRule::Offset),
    ("RAILTYPE_TUNNELS", 0x17, 16, BlockRule::Offset),
    ("OTTD_RECOLOUR", 0x18, 1, BlockRule::Offset),
];

/// Replacement type name → code and sprite-count rule.
#[derive(Debug, Clone)]
pub struct ReplacementTypeTable {
    types: HashMap<String, ReplacementType>,
}

impl Default for ReplacementTypeTable {
    fn default() -> Self {
        ReplacementTypeTable::builtin()
    }
}

impl ReplacementTypeTable {
    pub fn builtin() -> Self {
        let types = BUILTIN_TYPES
            .iter()
            .map(|&(name, code, sprites, block)| {
                (
                    name.to_string(),
                    ReplacementType {
                        code,
                        sprites,
                        block,
                    },
                )
            })
            .collect();
        ReplacementTypeTable { types }
    }

    /// Add or override a type. Returns the previous definition, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        ty: ReplacementType,
    ) -> Option<ReplacementType> {
        self.types.insert(name.into(), ty)
    }

    pub fn get(&self, name: &str) -> Option<&ReplacementType> {
        self.types.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceNewAction {
    /// Replacement type name as written, kept for listings.
    pub type_name: String,
    pub type_code: u8,
    pub num_sprites: u16,
    /// First replaced sprite within the type's block.
    pub offset: u16,
    /// Whether `offset` is written out (and the type byte flagged).
    pub encode_offset: bool,
}

impl ReplaceNewAction {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![ACTION_REPLACE_NEW];
        if self.encode_offset {
            out.push(self.type_code | OFFSET_FLAG);
            push_extended_byte(&mut out, self.num_sprites);
            push_extended_byte(&mut out, self.offset);
        } else {
            out.push(self.type_code);
            push_extended_byte(&mut out, self.num_sprites);
        }
        out
    }

    /// Positions within the type's sprite block, in real sprite order.
    pub fn slots(&self) -> impl Iterator<Item = u32> {
        let first = u32::from(self.offset);
        first..first + u32::from(self.num_sprites)
    }
}

impl GenerateActions for TypeReplacement {
    fn generate_actions(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<ActionRecord>, CompileError> {
        let target = self.target_type();
        let ty = *ctx.replacement_types().get(&target.value).ok_or_else(|| {
            CompileError::new(
                CompileErrorKind::UnknownReplacementType {
                    name: target.value.clone(),
                },
                target.span.clone(),
            )
        })?;
        if ty.code >= OFFSET_FLAG {
            return Err(CompileError::new(
                CompileErrorKind::Range {
                    what: format!("code of sprite replacement type '{}'", target.value),
                    min: 0,
                    max: i64::from(OFFSET_FLAG - 1),
                    value: i64::from(ty.code),
                },
                target.span.clone(),
            ));
        }

        let sprites = ctx.real_sprites(
            self.sprites(),
            self.source_file(),
            "replacenew-block",
            self.span(),
        )?;
        let count = sprites.len();
        let num_sprites = u16::try_from(count).map_err(|_| {
            CompileError::new(
                CompileErrorKind::Range {
                    what: "number of sprites in replacenew-block".into(),
                    min: 1,
                    max: i64::from(u16::MAX),
                    value: count as i64,
                },
                self.span().clone(),
            )
        })?;
        let offset = self.offset();

        let encode_offset = match ty.block {
            BlockRule::Fixed => {
                if count < ty.sprites {
                    return Err(CompileError::new(
                        CompileErrorKind::SpriteCount {
                            name: target.value.clone(),
                            expected: ty.sprites,
                            found: count,
                        },
                        self.span().clone(),
                    ));
                }
                if count > ty.sprites {
                    ctx.warn(
                        format!(
                            "too many sprites specified for sprite replacement type '{}', expected {}, got {}, extra sprites may be ignored",
                            target.value, ty.sprites, count
                        ),
                        self.span().clone(),
                    );
                }
                check_zero_offset(&target.value, offset, self)?;
                false
            }
            BlockRule::Any => {
                check_zero_offset(&target.value, offset, self)?;
                false
            }
            BlockRule::Offset => {
                if count + usize::from(offset) > ty.sprites {
                    ctx.warn(
                        format!(
                            "exceeding the limit of {} sprites for sprite replacement type '{}', extra sprites may be ignored",
                            ty.sprites, target.value
                        ),
                        self.span().clone(),
                    );
                }
                offset != 0 || count != ty.sprites
            }
        };

        debug!(
            "replacenew-block: {} sprite(s) of {} at offset {}",
            count, target.value, offset
        );
        let mut actions = Vec::with_capacity(count + 1);
        actions.push(ActionRecord::ReplaceNew(ReplaceNewAction {
            type_name: target.value.clone(),
            type_code: ty.code,
            num_sprites,
            offset,
            encode_offset,
        }));
        actions.extend(sprites.into_iter().map(ActionRecord::RealSprite));
        Ok(actions)
    }
}

fn check_zero_offset(
    type_name: &str,
    offset: u16,
    block: &TypeReplacement,
) -> Result<(), CompileError> {
    if offset == 0 {
        return Ok(());
    }
    Err(CompileError::new(
        CompileErrorKind::Range {
            what: format!(
                "replacenew parameter 'offset' for sprite replacement type '{}'",
                type_name
            ),
            min: 0,
            max: 0,
            value: i64::from(offset),
        },
        block.span().clone(),
    ))
}
