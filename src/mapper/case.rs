//! Case-style rewriting between external and internal field names
//!
//! External names are mixed case (`createdAt`), internal names are underscore
//! case (`created_at`). Every ASCII uppercase letter after the first character
//! becomes `_` plus its lowercase form, and the reverse rewrite uppercases the
//! character following each `_`. The pair is lossless for names matching
//! `[a-z][A-Za-z0-9]*`.

/// `createdAt` -> `created_at`
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// `created_at` -> `createdAt`
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
            continue;
        }
        if upper_next && !out.is_empty() {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        upper_next = false;
    }
    out
}

/// Whether a name is usable as a column identifier
pub fn is_well_formed(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
