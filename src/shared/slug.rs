//! URL slug derivation for category names.

/// Derive a URL-safe slug from a display name.
///
/// Lowercases, trims, collapses whitespace and hyphen runs into a
/// single hyphen, drops every other character outside `[a-z0-9-]` and
/// trims leading/trailing hyphens. Total: never fails, but may return
/// an empty string (e.g. for an all-symbol input) - callers must
/// substitute a placeholder before using the result as an identifier.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        }
        // anything else is dropped without acting as a separator
    }

    slug
}
