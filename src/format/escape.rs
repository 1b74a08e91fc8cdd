//! Text escaping for memento values
//!
//! Markup characters become the five named entities and anything XML 1.0
//! cannot carry becomes a hex character reference. [`unescape`] reverses
//! [`escape`] and [`escape_attribute`] exactly in a single pass.

/// Characters XML 1.0 can carry literally; carriage returns are referenced
/// anyway so readers that normalise line endings cannot alter them.
fn is_literal(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape text for use as element content
pub fn escape(input: &str) -> String {
    escape_with(input, is_literal)
}

/// Escape text for use as an attribute value. Tabs and line feeds are
/// referenced too, since readers normalise literal ones to spaces there.
pub fn escape_attribute(input: &str) -> String {
    escape_with(input, |c| c != '\t' && c != '\n' && is_literal(c))
}

fn escape_with(input: &str, literal: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if literal(c) => out.push(c),
            c => out.push_str(&format!("&#x{:X};", c as u32)),
        }
    }
    out
}

/// Reverse [`escape`]. Accepts hex and decimal character references and the
/// five named entities; anything unrecognised is kept verbatim.
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match rest.find(';').and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end))) {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
