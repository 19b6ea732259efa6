//! Static font metrics for the two base-14 fonts the exporter uses.
//!
//! Widths come from the Adobe Helvetica and Helvetica-Bold AFM files, in
//! 1/1000 em. Text is measured after WinAnsi encoding so measurement and
//! rendering always agree on which glyph is drawn.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Resource name inside the page's font dictionary.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }
}

/// Byte drawn for characters WinAnsi cannot represent.
pub const REPLACEMENT: u8 = b'?';

/// WinAnsi byte for `c`. Latin-1 maps to itself; a handful of typographic
/// characters live in 0x80..=0x9F; anything else becomes `?`.
pub fn encode_char(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '\t' => b' ',
        _ => REPLACEMENT,
    }
}

pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}

/// ASCII 0x20..=0x7E.
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Latin-1 0xA0..=0xFF.
#[rustfmt::skip]
const HELVETICA_LATIN1: [u16; 96] = [
    // nbsp ¡   ¢    £    ¤    ¥    ¦    §    ¨    ©    ª    «    ¬    shy  ®    ¯
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    // °    ±    ²    ³    ´    µ    ¶    ·    ¸    ¹    º    »    ¼    ½    ¾    ¿
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    // À-Å, Æ, Ç, È-Ë, Ì-Ï
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    // Ð, Ñ, Ò-Ö, ×, Ø, Ù-Ü, Ý, Þ, ß
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    // à-å, æ, ç, è-ë, ì-ï
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    // ð, ñ, ò-ö, ÷, ø, ù-ü, ý, þ, ÿ
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// Width of one WinAnsi byte in 1/1000 em.
pub fn glyph_width(font: Font, byte: u8) -> u16 {
    let (ascii, latin1) = match font {
        Font::Regular => (&HELVETICA_ASCII, &HELVETICA_LATIN1),
        Font::Bold => (&HELVETICA_BOLD_ASCII, &HELVETICA_BOLD_LATIN1),
    };
    match byte {
        0x20..=0x7E => ascii[(byte - 0x20) as usize],
        0xA0..=0xFF => latin1[(byte - 0xA0) as usize],
        0x80 | 0x96 => 556,
        0x85 | 0x97 => 1000,
        0x95 => 350,
        0x91 | 0x92 => match font {
            Font::Regular => 222,
            Font::Bold => 278,
        },
        0x93 | 0x94 => match font {
            Font::Regular => 333,
            Font::Bold => 500,
        },
        _ => ascii[(REPLACEMENT - 0x20) as usize],
    }
}

/// Rendered width of `text` in points at `size`.
pub fn text_width(font: Font, text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| u32::from(glyph_width(font, encode_char(c))))
        .sum();
    units as f32 * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_latin1_and_fallback() {
        assert_eq!(encode_text("ação"), vec![b'a', 0xE7, 0xE3, b'o']);
        assert_eq!(encode_char('é'), 0xE9);
        assert_eq!(encode_char('•'), 0x95);
        assert_eq!(encode_char('日'), b'?');
        assert_eq!(encode_char('😀'), b'?');
    }

    #[test]
    fn test_known_afm_widths() {
        assert_eq!(glyph_width(Font::Regular, b' '), 278);
        assert_eq!(glyph_width(Font::Regular, b'W'), 944);
        assert_eq!(glyph_width(Font::Regular, b'i'), 222);
        assert_eq!(glyph_width(Font::Bold, b'i'), 278);
        assert_eq!(glyph_width(Font::Regular, b'@'), 1015);
        assert_eq!(glyph_width(Font::Bold, b'@'), 975);
    }

    #[test]
    fn test_accented_letters_match_base_letters() {
        for (accented, base) in [('á', 'a'), ('é', 'e'), ('ç', 'c'), ('õ', 'o')] {
            for font in [Font::Regular, Font::Bold] {
                assert_eq!(
                    glyph_width(font, encode_char(accented)),
                    glyph_width(font, encode_char(base)),
                    "{accented} vs {base}"
                );
            }
        }
    }

    #[test]
    fn test_accented_i_is_wider_than_dotted_i() {
        // iacute uses the dotless-i advance plus room for the accent.
        assert_eq!(glyph_width(Font::Regular, encode_char('í')), 278);
        assert_eq!(glyph_width(Font::Regular, b'i'), 222);
        assert_eq!(glyph_width(Font::Bold, encode_char('í')), 278);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let w10 = text_width(Font::Regular, "LifeWay", 10.0);
        let w20 = text_width(Font::Regular, "LifeWay", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
        // L 556 + i 222 + f 278 + e 556 + W 944 + a 556 + y 500 = 3612
        assert!((w10 - 36.12).abs() < 1e-3);
    }

    #[test]
    fn test_bold_is_wider() {
        assert!(text_width(Font::Bold, "Análise de Vistos", 12.0) > text_width(Font::Regular, "Análise de Vistos", 12.0));
    }

    #[test]
    fn test_unmappable_measured_as_replacement() {
        assert_eq!(text_width(Font::Regular, "日", 10.0), text_width(Font::Regular, "?", 10.0));
    }
}
