//! Action 0x0A: replace base-set sprites by number.
//!
//! Layout: `0A <num-sets> (<num-sprites:B> <first-sprite:W>)+`.

use log::debug;

use crate::action::ActionRecord;
use crate::block::IdRangeReplacement;
use crate::error::{CompileError, CompileErrorKind};
use crate::generator::{GenerateActions, GenerationContext};

pub const ACTION_REPLACE: u8 = 0x0A;

const MAX_SPRITES_PER_SET: usize = 0xFF;
const MAX_SETS: usize = 0xFF;
const MAX_SPRITE_ID: i64 = 0xFFFF;

/// `num_sprites` consecutive sprites starting at `first_sprite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteRange {
    pub num_sprites: u8,
    pub first_sprite: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceAction {
    pub sets: Vec<SpriteRange>,
}

impl ReplaceAction {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + 3 * self.sets.len());
        out.push(ACTION_REPLACE);
        out.push(self.sets.len() as u8);
        for set in &self.sets {
            out.push(set.num_sprites);
            out.extend_from_slice(&set.first_sprite.to_le_bytes());
        }
        out
    }

    /// Sprite numbers replaced, in the order the real sprites follow.
    pub fn slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.sets.iter().flat_map(|set| {
            let first = u32::from(set.first_sprite);
            first..first + u32::from(set.num_sprites)
        })
    }

    pub fn num_sprites(&self) -> usize {
        self.sets.iter().map(|set| usize::from(set.num_sprites)).sum()
    }
}

impl GenerateActions for IdRangeReplacement {
    fn generate_actions(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Vec<ActionRecord>, CompileError> {
        let sprites =
            ctx.real_sprites(self.sprites(), self.source_file(), "replace-block", self.span())?;

        let start = self.start_id();
        let last = start.saturating_add(sprites.len() as i64 - 1);
        if start < 0 || last > MAX_SPRITE_ID {
            return Err(CompileError::new(
                CompileErrorKind::Range {
                    what: "replace-block sprite number".into(),
                    min: 0,
                    max: MAX_SPRITE_ID,
                    value: if start < 0 { start } else { last },
                },
                self.span().clone(),
            )
            .with_note(format!(
                "{} sprite(s) starting at {} do not fit in the sprite number range",
                sprites.len(),
                start
            )));
        }

        // Split into sets of at most 255 sprites; each set continues where
        // the previous one ended.
        let mut sets = Vec::new();
        let mut covered = 0usize;
        while covered < sprites.len() {
            let this_set = (sprites.len() - covered).min(MAX_SPRITES_PER_SET);
            sets.push(SpriteRange {
                num_sprites: this_set as u8,
                first_sprite: (start + covered as i64) as u16,
            });
            covered += this_set;
        }
        if sets.len() > MAX_SETS {
            return Err(CompileError::new(
                CompileErrorKind::Range {
                    what: "number of sprite sets in replace-block".into(),
                    min: 1,
                    max: MAX_SETS as i64,
                    value: sets.len() as i64,
                },
                self.span().clone(),
            ));
        }

        debug!(
            "replace-block: {} sprite(s) from {} in {} set(s)",
            sprites.len(),
            start,
            sets.len()
        );
        let mut actions = Vec::with_capacity(sprites.len() + 1);
        actions.push(ActionRecord::Replace(ReplaceAction { sets }));
        actions.extend(sprites.into_iter().map(ActionRecord::RealSprite));
        Ok(actions)
    }
}
