/// Replace CR, LF and TAB with `\r`, `\n` and `\t` so a text fits into one tab-delimited field.
pub fn escape_cr_lf_tab(input: &str) -> String {
    escape_controls(input, false)
}

/// Same as [`escape_cr_lf_tab`], and also replaces embedded NUL characters with `\0`.
///
/// String table entries are length-prefixed rather than NUL-terminated, so they can carry NULs.
pub fn escape_cr_lf_tab_nul(input: &str) -> String {
    escape_controls(input, true)
}

#[inline]
fn escape_controls(input: &str, escape_nul: bool) -> String {
    if !input
        .bytes()
        .any(|b| matches!(b, b'\r' | b'\n' | b'\t') || (escape_nul && b == 0))
    {
        return input.to_owned();
    }

    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\0' if escape_nul => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}
