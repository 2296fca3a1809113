use std::collections::HashMap;

use lazy_static::lazy_static;

/// Characters 0x80..=0xFF of code page 437, the OEM code page of US-English
/// Windows installations.
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

const REPLACEMENT: u8 = b'?';

lazy_static! {
    static ref OEM_ENCODER: HashMap<char, u8> = CP437_HIGH
        .iter()
        .enumerate()
        .map(|(idx, c)| (*c, 0x80 + idx as u8))
        .collect();
}

/// Encodes `text` in the OEM code page. Unmappable characters become `?`.
pub fn oem_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else {
                OEM_ENCODER.get(&c).copied().unwrap_or(REPLACEMENT)
            }
        })
        .collect()
}

/// Decodes OEM bytes, used for the OEM-encoded strings of NTLM messages.
pub fn oem_string(bytes: &[u8]) -> String {
    bytes.iter()
        .map(|b| if b.is_ascii() { *b as char } else { CP437_HIGH[(*b - 0x80) as usize] })
        .collect()
}
