//! Textual NFO listing of an action stream.

use std::io::{self, Write};

use crate::action::{ActionRecord, RealSpriteRecord};

/// Write one numbered line per record, starting at 1.
pub fn write_nfo(actions: &[ActionRecord], writer: &mut dyn Write) -> io::Result<()> {
    for (index, action) in actions.iter().enumerate() {
        let number = index + 1;
        match action {
            ActionRecord::RealSprite(sprite) => write_real_sprite(number, sprite, writer)?,
            pseudo => {
                let bytes = pseudo.pseudo_bytes().unwrap_or_default();
                let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
                writeln!(writer, "{number:>5} * {}\t {}", bytes.len(), hex.join(" "))?;
            }
        }
    }
    Ok(())
}

fn write_real_sprite(
    number: usize,
    sprite: &RealSpriteRecord,
    writer: &mut dyn Write,
) -> io::Result<()> {
    writeln!(
        writer,
        "{number:>5} {} {} {} {} {} {} {}",
        sprite.file,
        sprite.left,
        sprite.top,
        sprite.width,
        sprite.height,
        sprite.xoffset,
        sprite.yoffset
    )
}

/// The listing as a string.
pub fn to_nfo_string(actions: &[ActionRecord]) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_nfo(actions, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ReplaceAction, SpriteRange};

    #[test]
    fn numbers_lines_and_formats_records() {
        let actions = vec![
            ActionRecord::Replace(ReplaceAction {
                sets: vec![SpriteRange {
                    num_sprites: 1,
                    first_sprite: 0x64,
                }],
            }),
            ActionRecord::RealSprite(RealSpriteRecord {
                file: "a.png".into(),
                left: 0,
                top: 8,
                width: 16,
                height: 16,
                xoffset: -8,
                yoffset: 0,
            }),
        ];
        assert_eq!(
            to_nfo_string(&actions),
            "    1 * 5\t 0A 01 01 64 00\n    2 a.png 0 8 16 16 -8 0\n"
        );
    }

    #[test]
    fn empty_stream_writes_nothing() {
        assert_eq!(to_nfo_string(&[]), "");
    }
}
