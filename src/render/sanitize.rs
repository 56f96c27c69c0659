// src/render/sanitize.rs
//! Text reduction to the character subset the built-in PDF fonts can draw.

/// Printable ASCII only. Typographic punctuation and common Latin-1 letters are
/// folded to ASCII look-alikes; anything else is dropped. Whitespace is collapsed.
pub fn pdf_safe(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_space = true;
    for ch in input.chars() {
        let mapped: &str = match ch {
            ' '..='~' => {
                push_collapsed(&mut out, ch, &mut prev_space);
                continue;
            }
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => "'",
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{00AB}' | '\u{00BB}' | '\u{2033}' => "\"",
            '\u{2010}'..='\u{2015}' | '\u{2212}' => "-",
            '\u{2022}' | '\u{00B7}' | '\u{25CF}' => "*",
            '\u{2026}' => "...",
            '\u{20AC}' => "EUR",
            '\u{00A3}' => "GBP",
            '\u{00A9}' => "(c)",
            '\u{00AE}' => "(R)",
            '\u{2122}' => "(TM)",
            c if c.is_whitespace() => " ",
            c => fold_latin(c).unwrap_or(""),
        };
        for m in mapped.chars() {
            push_collapsed(&mut out, m, &mut prev_space);
        }
    }
    out.trim_end().to_string()
}

fn push_collapsed(out: &mut String, c: char, prev_space: &mut bool) {
    if c == ' ' {
        if !*prev_space {
            out.push(' ');
        }
        *prev_space = true;
    } else {
        out.push(c);
        *prev_space = false;
    }
}

fn fold_latin(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' => "c",
        'Ç' => "C",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ñ' => "n",
        'Ñ' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ß' => "ss",
        _ => return None,
    })
}
