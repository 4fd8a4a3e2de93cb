//! Chat text helpers

/// Remove `[color]`, `[#hex]` and `[]` markup. `[[` is an escaped bracket.
pub fn strip_colors(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('[') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if let Some(escaped) = after.strip_prefix('[') {
            out.push('[');
            rest = escaped;
            continue;
        }

        match after.find(']') {
            Some(end) if is_color_tag(&after[..end]) => rest = &after[end + 1..],
            _ => {
                out.push('[');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_color_tag(tag: &str) -> bool {
    if let Some(hex) = tag.strip_prefix('#') {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    tag.chars().all(|c| c.is_ascii_alphabetic())
}

/// Upper-case the first character, leave the rest untouched
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
