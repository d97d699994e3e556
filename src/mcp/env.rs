use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `${UPPER_SNAKE_CASE}` placeholder. Lower-case names and bare `$VAR` are
/// left alone.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap_or_else(|e| panic!("placeholder regex: {e}"))
});

/// Result of expanding one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub value: String,
    /// Variables that had no value, in order of first appearance.
    pub unresolved: Vec<String>,
}

/// Replace `${VAR}` placeholders with values from the process environment.
///
/// Unset variables are left verbatim and reported with a warning.
pub fn expand_env_vars(value: &str) -> String {
    let expansion = expand_env_vars_with(value, |name| std::env::var(name).ok());
    for name in &expansion.unresolved {
        log::warn!("Environment variable '{name}' not set, leaving placeholder unexpanded");
    }
    expansion.value
}

/// Same as [`expand_env_vars`] but against an arbitrary lookup, without
/// logging.
pub fn expand_env_vars_with<F>(value: &str, lookup: F) -> Expansion
where
    F: Fn(&str) -> Option<String>,
{
    let mut unresolved: Vec<String> = Vec::new();
    let expanded = PLACEHOLDER.replace_all(value, |caps: &Captures| {
        let name = &caps[1];
        match lookup(name) {
            Some(v) => v,
            None => {
                if !unresolved.iter().any(|n| n == name) {
                    unresolved.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });
    Expansion {
        value: expanded.into_owned(),
        unresolved,
    }
}

/// Placeholder names referenced by `value`, deduplicated, in order.
pub fn referenced_vars(value: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(value) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Referenced variables that are not currently set in the environment.
pub fn unset_vars(value: &str) -> Vec<String> {
    referenced_vars(value)
        .into_iter()
        .filter(|name| std::env::var_os(name).is_none())
        .collect()
}
