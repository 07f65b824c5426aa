//! Text rendering utilities for identities in error messages and logs.
//!
//! Type names coming out of [`std::any::type_name`] are long and fully
//! qualified. Keyed identities nest them twice (a key and a service), so
//! everything printed by the container goes through these helpers.

/// Shortens a fully qualified type name for display.
///
/// ```
/// use miftah_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '&' | '[' | ']' | ';' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Renders an instantiated generic family, e.g. `ProviderDependency<Primary, Arc<dyn Thing>>`.
///
/// ```
/// use miftah_support::rendering::render_generic;
///
/// assert_eq!(render_generic("Keyed", &["Primary", "Thing"]), "Keyed<Primary, Thing>");
/// assert_eq!(render_generic("Marker", &[] as &[&str]), "Marker");
/// ```
pub fn render_generic(family: &str, args: &[impl AsRef<str>]) -> String {
    if args.is_empty() {
        return family.to_string();
    }
    let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
    format!("{family}<{}>", args.join(", "))
}

/// Renders a keyed identity as `Service [key = Key]` using short names.
///
/// ```
/// use miftah_support::rendering::render_keyed;
///
/// let rendered = render_keyed("app::keys::Primary", "alloc::sync::Arc<dyn app::Thing>");
/// assert_eq!(rendered, "Arc<dyn Thing> [key = Primary]");
/// ```
pub fn render_keyed(key: &str, service: &str) -> String {
    format!(
        "{} [key = {}]",
        shorten_type_name(service),
        shorten_type_name(key)
    )
}

/// Generates "did you mean?" suggestions from the rendered identities a
/// registry knows about.
///
/// Exact substring matches rank first, then matches on the shortened name,
/// then names sharing a prefix of at least three characters.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|name| **name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.dedup_by(|a, b| a.0 == b.0);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_simple_path() {
        assert_eq!(shorten_type_name("my_app::services::UserService"), "UserService");
    }

    #[test]
    fn shorten_nested_generics() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn miftah_container::dependency::Dependency<app::Primary, alloc::string::String>>"),
            "Arc<dyn Dependency<Primary, String>>"
        );
    }

    #[test]
    fn shorten_tuples_and_refs() {
        assert_eq!(shorten_type_name("(core::option::Option<&str>, u8)"), "(Option<&str>, u8)");
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn keyed_rendering_uses_short_names() {
        assert_eq!(render_keyed("a::K1", "b::Thing"), "Thing [key = K1]");
    }

    #[test]
    fn suggestions_prefer_substring_matches() {
        let available = vec![
            "Arc<dyn Thing> [key = Primary]",
            "Arc<dyn Thing> [key = Replica]",
            "Database",
        ];

        let suggestions = suggest_similar("Arc<dyn Thing>", &available, 3);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| s.contains("Thing")));
    }

    #[test]
    fn suggestions_skip_the_request_itself() {
        let available = vec!["Database"];
        assert!(suggest_similar("Database", &available, 3).is_empty());
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["my_app::Database"];
        assert!(suggest_similar("XyzAbcDef", &available, 3).is_empty());
    }
}
