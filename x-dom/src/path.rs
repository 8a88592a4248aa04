//! Path expression helpers shared by documents and elements.
//!
//! Elements resolve local expressions by prefixing their own computed path,
//! so every element-scoped query ends up as an absolute query against the
//! whole document.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

fn bare_name_regex() -> &'static Regex {
    static BARE_NAME: OnceLock<Regex> = OnceLock::new();
    BARE_NAME.get_or_init(|| Regex::new(r"^\w+$").expect("bare name pattern is valid"))
}

/// A local expression does not start with `/` (which also covers `//`).
pub fn is_local(expr: &str) -> bool {
    !expr.starts_with('/')
}

/// A bare name is one or more word characters and nothing else. Bare names
/// are resolved by direct child lookup instead of the query engine.
pub fn is_bare_name(expr: &str) -> bool {
    bare_name_regex().is_match(expr)
}

/// Turn a local expression into an absolute one rooted at the document.
pub fn promote_to_absolute(expr: &str) -> Cow<'_, str> {
    if is_local(expr) {
        Cow::Owned(format!("/{expr}"))
    } else {
        Cow::Borrowed(expr)
    }
}

/// Resolve a local expression against the absolute path of a base element.
/// Absolute expressions are returned untouched.
pub fn resolve_against<'a>(base: &str, expr: &'a str) -> Cow<'a, str> {
    if is_local(expr) {
        Cow::Owned(format!("{base}/{expr}"))
    } else {
        Cow::Borrowed(expr)
    }
}

/// One `name[n]` step of a computed path; `position` is 1-based.
pub fn step(name: &str, position: usize) -> String {
    format!("{name}[{position}]")
}

/// Check that `name` can be used as an element or attribute name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}
