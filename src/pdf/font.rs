//! Watermark font: the standard Helvetica Type1 font with WinAnsiEncoding
//!
//! Helvetica is one of the 14 standard PDF fonts, so nothing is embedded. We keep
//! its glyph widths here to center text without a shaping engine.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Distance from baseline to the top of the tallest glyphs, in 1/1000 em
pub const HELVETICA_ASCENT: f32 = 718.0;

/// Add a Helvetica font dictionary to the document
pub fn add_helvetica(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

    doc.add_object(Object::Dictionary(font))
}

/// Encode text as WinAnsi (cp1252) bytes
///
/// Characters outside the encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => c as u8,
        _ => match c {
            '€' => 128,
            '‚' => 130,
            'ƒ' => 131,
            '„' => 132,
            '…' => 133,
            '†' => 134,
            '‡' => 135,
            'ˆ' => 136,
            '‰' => 137,
            'Š' => 138,
            '‹' => 139,
            'Œ' => 140,
            'Ž' => 142,
            '\u{2018}' => 145,
            '\u{2019}' => 146,
            '\u{201C}' => 147,
            '\u{201D}' => 148,
            '•' => 149,
            '–' => 150,
            '—' => 151,
            '˜' => 152,
            '™' => 153,
            'š' => 154,
            '›' => 155,
            'œ' => 156,
            'ž' => 158,
            'Ÿ' => 159,
            _ => b'?',
        },
    }
}

/// Width of WinAnsi-encoded text in points
pub fn text_width(encoded: &[u8], font_size: f32) -> f32 {
    let units: u32 = encoded.iter().map(|&b| glyph_width(b) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Helvetica glyph width for a WinAnsi code, in 1/1000 em
fn glyph_width(code: u8) -> u16 {
    match code {
        32..=126 => ASCII_WIDTHS[(code - 32) as usize],
        128..=159 => HIGH_WIDTHS[(code - 128) as usize],
        160..=255 => LATIN1_WIDTHS[(code - 160) as usize],
        // Unmapped codes render as .notdef
        _ => 278,
    }
}

/// Chars 32-126
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, // space ! " # $ % & '
    333, 333, 389, 584, 278, 333, 278, 278, // ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, // 0-7
    556, 556, 278, 278, 584, 584, 584, 556, // 8 9 : ; < = > ?
    1015, 667, 667, 722, 722, 667, 611, 778, // @ A-G
    722, 278, 500, 667, 556, 833, 722, 778, // H-O
    667, 778, 722, 667, 611, 722, 667, 944, // P-W
    667, 667, 611, 278, 278, 278, 469, 556, // X Y Z [ \ ] ^ _
    333, 556, 556, 500, 556, 556, 278, 556, // ` a-g
    556, 222, 222, 500, 222, 833, 556, 556, // h-o
    556, 556, 333, 500, 278, 556, 500, 722, // p-w
    500, 500, 500, 334, 260, 334, 584,      // x y z { | } ~
];

/// Chars 128-159 (cp1252 specials, undefined slots as .notdef)
const HIGH_WIDTHS: [u16; 32] = [
    556, 278, 222, 556, 333, 1000, 556, 556, // € - ‚ ƒ „ … † ‡
    333, 1000, 667, 333, 1000, 278, 611, 278, // ˆ ‰ Š ‹ Œ - Ž -
    278, 222, 222, 333, 333, 350, 556, 1000, // - ‘ ’ “ ” • – —
    333, 1000, 500, 333, 944, 278, 500, 667, // ˜ ™ š › œ - ž Ÿ
];

/// Chars 160-255
const LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, // nbsp ¡ ¢ £ ¤ ¥ ¦ §
    333, 737, 370, 556, 584, 333, 737, 333, // ¨ © ª « ¬ shy ® ¯
    400, 584, 333, 333, 333, 556, 537, 278, // ° ± ² ³ ´ µ ¶ ·
    333, 333, 365, 556, 834, 834, 834, 611, // ¸ ¹ º » ¼ ½ ¾ ¿
    667, 667, 667, 667, 667, 667, 1000, 722, // À-Å Æ Ç
    667, 667, 667, 667, 278, 278, 278, 278, // È-Ë Ì-Ï
    722, 722, 778, 778, 778, 778, 778, 584, // Ð Ñ Ò-Ö ×
    778, 722, 722, 722, 722, 667, 667, 611, // Ø Ù-Ü Ý Þ ß
    556, 556, 556, 556, 556, 556, 889, 500, // à-å æ ç
    556, 556, 556, 556, 278, 278, 278, 278, // è-ë ì-ï
    556, 556, 556, 556, 556, 556, 556, 584, // ð ñ ò-ö ÷
    611, 556, 556, 556, 556, 500, 556, 500, // ø ù-ü ý þ ÿ
];
