//! Path canonicalization shared by every pipeline phase
//!
//! All graph endpoints are canonical bundle-relative strings: forward
//! slashes, no leading `./`, no empty or `.` segments, `..` popped.
//! Absolute paths pass through untouched so the exporter can decide
//! whether to surface them.

/// True for `/…` and `C:…` style paths.
fn is_absolute(p: &str) -> bool {
    if p.starts_with('/') {
        return true;
    }
    let mut chars = p.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), Some(':')) if c.is_ascii_alphabetic()
    )
}

/// Canonicalize a path string. Idempotent: `canon(canon(x)) == canon(x)`.
pub fn canon(p: &str) -> String {
    let s = p.trim().replace('\\', "/");
    if s.is_empty() || is_absolute(&s) {
        return s;
    }
    let s = s.strip_prefix("./").unwrap_or(&s);
    let mut parts: Vec<&str> = Vec::new();
    for seg in s.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                // Popping past the bundle root is a no-op.
                parts.pop();
            }
            _ => parts.push(seg),
        }
    }
    parts.join("/")
}

/// Canonicalize and apply the bundle's case policy.
pub fn canon_case(p: &str, windowsish: bool) -> String {
    let c = canon(p);
    if windowsish { c.to_lowercase() } else { c }
}

/// Drop surrounding single or double quotes.
pub fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// The directory part of a canonical relative path ("" for bare names).
pub fn parent_dir(p: &str) -> &str {
    match p.rfind('/') {
        Some(i) => &p[..i],
        None => "",
    }
}

/// Join a target against a caller's directory, canonically.
pub fn join_rel(dir: &str, p: &str) -> String {
    if dir.is_empty() {
        canon(p)
    } else {
        canon(&format!("{dir}/{p}"))
    }
}

/// Truncate to at most `n` bytes without splitting a UTF-8 character.
pub fn snip(s: &str, n: usize) -> &str {
    if s.len() <= n {
        return s;
    }
    let mut i = n;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    &s[..i]
}
