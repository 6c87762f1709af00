//! Text Extraction
//!
//! Drops everything between `<` and `>`; no entity decoding, no layout.

/// Keep only the characters outside of tags
pub fn strip_tags(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_tag = false;

    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}
