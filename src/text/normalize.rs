use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap());
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[•·●▪▶►]+").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const DASHES: &[char] = &[
    '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}',
];

/// Canonicalize text so every downstream pattern can assume ASCII hyphens
/// and single-spaced tokens.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let decoded = decode_entities(text);
    let folded: String = decoded
        .nfkc()
        .map(|c| match c {
            c if DASHES.contains(&c) => '-',
            '\u{00A0}' => ' ',
            c => c,
        })
        .collect();
    let unbulleted = BULLET_RE.replace_all(&folded, " ");
    SPACE_RE.replace_all(&unbulleted, " ").trim().to_string()
}

/// Decode named and numeric character references. Unknown names are kept verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(num) = body.strip_prefix('#') {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32).map(String::from)
            } else {
                named_entity(body).map(String::from)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<&'static str> {
    let s = match name {
        "amp" | "AMP" => "&",
        "lt" | "LT" => "<",
        "gt" | "GT" => ">",
        "quot" | "QUOT" => "\"",
        "apos" => "'",
        "nbsp" => "\u{00A0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "minus" => "\u{2212}",
        "hyphen" | "dash" => "\u{2010}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00B7}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        "euro" => "\u{20AC}",
        "pound" => "\u{00A3}",
        "cent" => "\u{00A2}",
        "dollar" => "$",
        "plus" => "+",
        "num" => "#",
        "sol" => "/",
        "colon" => ":",
        "comma" => ",",
        "period" => ".",
        "semi" => ";",
        "lpar" => "(",
        "rpar" => ")",
        "eacute" => "\u{00E9}",
        "egrave" => "\u{00E8}",
        "agrave" => "\u{00E0}",
        "ccedil" => "\u{00E7}",
        "ocirc" => "\u{00F4}",
        "ecirc" => "\u{00EA}",
        "thinsp" | "ensp" | "emsp" => " ",
        "zwnj" | "zwj" | "shy" => "",
        _ => return None,
    };
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn dashes_become_hyphens() {
        assert_eq!(normalize("5\u{2013}10 years"), "5-10 years");
        assert_eq!(normalize("a\u{2014}b\u{2212}c"), "a-b-c");
    }

    #[test]
    fn entities_decoded_before_folding() {
        assert_eq!(normalize("R&amp;D&nbsp;team &ndash; 5&#43; years"), "R&D team - 5+ years");
        assert_eq!(normalize("&#x24;90k"), "$90k");
        assert_eq!(normalize("&unknown; stays"), "&unknown; stays");
    }

    #[test]
    fn bullets_and_whitespace_collapse() {
        assert_eq!(normalize("• Rust\n\n● Go ▪▪ SQL"), "Rust Go SQL");
        assert_eq!(normalize("a\u{00A0}\u{00A0}b"), "a b");
    }

    #[test]
    fn compatibility_forms_folded() {
        // fullwidth digits and ligatures
        assert_eq!(normalize("\u{FF15}+ years"), "5+ years");
        assert_eq!(normalize("\u{FB01}nance"), "finance");
    }
}
