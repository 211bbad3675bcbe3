//! Action records: the compiled output of replace blocks.
//!
//! Pseudo-sprite actions encode to the exact bytes of the binary format.
//! Real sprite records name their pixel source. Pixel data is not loaded here.

pub mod replace;
pub mod replace_new;

pub use replace::{ReplaceAction, SpriteRange};
pub use replace_new::{BlockRule, ReplaceNewAction, ReplacementType, ReplacementTypeTable};

/// One element of the generated action stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRecord {
    /// Action 0x0A: replace base-set sprites by number.
    Replace(ReplaceAction),
    /// Action 0x05: replace sprites of a new-feature kind.
    ReplaceNew(ReplaceNewAction),
    /// A real sprite following one of the above.
    RealSprite(RealSpriteRecord),
}

impl ActionRecord {
    /// Encoded pseudo-sprite bytes, or `None` for real sprite records.
    pub fn pseudo_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ActionRecord::Replace(action) => Some(action.to_bytes()),
            ActionRecord::ReplaceNew(action) => Some(action.to_bytes()),
            ActionRecord::RealSprite(_) => None,
        }
    }
}

/// A real sprite with every field evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealSpriteRecord {
    /// Image file holding the pixel data.
    pub file: String,
    pub left: u32,
    pub top: u32,
    pub width: u16,
    pub height: u16,
    pub xoffset: i16,
    pub yoffset: i16,
}

/// Append `value` as an extended byte: one byte below 0xFF, otherwise
/// 0xFF followed by a little-endian word.
pub(crate) fn push_extended_byte(out: &mut Vec<u8>, value: u16) {
    if value < 0xFF {
        out.push(value as u8);
    } else {
        out.push(0xFF);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_byte_encoding() {
        let mut out = Vec::new();
        push_extended_byte(&mut out, 0xFE);
        push_extended_byte(&mut out, 0xFF);
        push_extended_byte(&mut out, 0x1234);
        assert_eq!(out, vec![0xFE, 0xFF, 0xFF, 0x00, 0xFF, 0x34, 0x12]);
    }
}
