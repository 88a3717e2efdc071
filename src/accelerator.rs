//! Removal of keyboard-accelerator markup from resource text.
//!
//! `&` marks the next character as the accelerator (`&Open`), `&&` is an escaped literal
//! ampersand. Languages that use an IME usually show a Latin accelerator in parentheses after the
//! localized label, e.g. `削除(&R)`; that whole parenthetical goes away as well.

/// Strip accelerator markers from `input`.
///
/// 1. Every `(&X)` span where `X` is `A-Z` or `0-9` is removed.
/// 2. Every single `&` is removed.
/// 3. Every escaped `&&` is kept as `&&`.
///
/// Stripping the output again is a no-op.
pub fn strip_accelerators(input: &str) -> String {
    let without_parenthesized = remove_parenthesized_accelerators(input);

    let mut out = String::with_capacity(without_parenthesized.len());
    let mut chars = without_parenthesized.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        // Pairs are matched left to right, so `&&&` keeps one escaped pair and drops the rest.
        if chars.peek() == Some(&'&') {
            chars.next();
            out.push_str("&&");
        }
    }
    out
}

fn is_accelerator_key(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

/// Removes non-overlapping `(&X)` spans, scanning left to right over the original text.
fn remove_parenthesized_accelerators(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        if let [open, amp, key, close, ..] = chars[i..] {
            if open == '(' && amp == '&' && is_accelerator_key(key) && close == ')' {
                i += 4;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_removes_single_ampersand() {
        assert_eq!(strip_accelerators("&Open"), "Open");
        assert_eq!(strip_accelerators("Save &As..."), "Save As...");
        assert_eq!(strip_accelerators("&"), "");
    }

    #[test]
    fn test_keeps_escaped_ampersand() {
        assert_eq!(strip_accelerators("A&&B"), "A&&B");
        assert_eq!(strip_accelerators("&Tools && Options"), "Tools && Options");
        assert_eq!(strip_accelerators("&&&"), "&&");
    }

    #[test]
    fn test_removes_east_asian_accelerator() {
        assert_eq!(strip_accelerators("Delete(&R)"), "Delete");
        assert_eq!(strip_accelerators("削除(&R)"), "削除");
        assert_eq!(strip_accelerators("開く(&1)..."), "開く...");
    }

    #[test]
    fn test_parenthetical_needs_uppercase_or_digit() {
        // Only the ampersand goes; the parenthetical is not an accelerator span.
        assert_eq!(strip_accelerators("Print(&r)"), "Print(r)");
        assert_eq!(strip_accelerators("(&&A)"), "(&&A)");
    }

    #[test]
    fn test_stripping_is_idempotent() {
        for input in [
            "Delete(&R)",
            "&Open",
            "A&&B",
            "&&&",
            "((&A)&B)",
            "&Tools && Options",
            "(&(&A)B)",
            "No markup at all",
        ] {
            let once = strip_accelerators(input);
            assert_eq!(strip_accelerators(&once), once, "input: {:?}", input);
        }
    }
}
