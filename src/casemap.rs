//! RFC 1459 case mapping.
//!
//! IRC nicknames and capability names compare case-insensitively, with the
//! RFC 1459 quirk that `[]\~` are the uppercase forms of `{}|^`.

fn lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c.to_ascii_lowercase(),
    }
}

/// Convert a string to IRC lowercase.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(lower_char).collect()
}

/// IRC case-insensitive string comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.chars().map(lower_char).eq(b.chars().map(lower_char))
}
