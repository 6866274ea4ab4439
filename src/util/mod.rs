//! Small shared helpers

/// Normalize a scope string to its canonical trailing-separator form
///
/// The empty scope stays empty (it denotes the whole graph); any other
/// scope gains a single trailing `/` if it does not already end with one.
pub fn scope_finalize(scope: &str) -> String {
    if scope.is_empty() || scope.ends_with('/') {
        scope.to_string()
    } else {
        format!("{scope}/")
    }
}

/// Strip the trailing separator from a finalized scope, if any
pub fn scope_basename(scope: &str) -> &str {
    scope.strip_suffix('/').unwrap_or(scope)
}
