//! User search input to backend `LIKE` filters.
//!
//! # Invariants
//! - Empty input means "no filter", so rows with `NULL` text are
//!   still returned.
//! - User input is always bound or escaped, never spliced into SQL.

/// Escape character used in SQLite `LIKE ... ESCAPE` clauses.
pub const SQLITE_LIKE_ESCAPE: char = '\\';

/// Builds a `%pattern%` value for `LIKE ? ESCAPE '\'`.
///
/// Returns `None` for empty input. `%`, `_` and `\` are escaped so they
/// match literally.
pub fn sqlite_like_pattern(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | SQLITE_LIKE_ESCAPE) {
            pattern.push(SQLITE_LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}

/// Builds a PostgREST `like` filter value (`like.*pattern*`).
///
/// Returns `None` for empty input. `%`, `_` and `\` are backslash-escaped;
/// a literal `*` cannot be expressed because PostgREST rewrites every `*`
/// into `%`.
pub fn postgrest_like_filter(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let mut filter = String::from("like.*");
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            filter.push('\\');
        }
        filter.push(ch);
    }
    filter.push('*');
    Some(filter)
}

#[cfg(test)]
mod tests {
    use super::{postgrest_like_filter, sqlite_like_pattern};

    #[test]
    fn empty_input_means_no_filter() {
        assert_eq!(sqlite_like_pattern(""), None);
        assert_eq!(postgrest_like_filter(""), None);
    }

    #[test]
    fn whitespace_is_a_real_pattern() {
        assert_eq!(sqlite_like_pattern(" ").as_deref(), Some("% %"));
    }

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(sqlite_like_pattern("50%_off").as_deref(), Some(r"%50\%\_off%"));
        assert_eq!(sqlite_like_pattern(r"a\b").as_deref(), Some(r"%a\\b%"));
        assert_eq!(postgrest_like_filter("a_b").as_deref(), Some(r"like.*a\_b*"));
    }
}
