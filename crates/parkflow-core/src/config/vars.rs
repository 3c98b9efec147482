//! Environment variable interpolation for config files.
//!
//! Supported forms:
//! - `$VAR` / `${VAR}`: the variable's value, an error if it is unset
//! - `${VAR:-fallback}`: fallback when VAR is unset or empty
//! - `${VAR-fallback}`: fallback only when VAR is unset
//! - `$$`: a literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<escape>\$\$)
        |
        \$\{
            (?P<braced>[A-Za-z_][A-Za-z0-9_]*)
            (?:(?P<op>:?-)(?P<fallback>[^}]*))?
        \}
        |
        \$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("valid placeholder pattern")
});

/// Outcome of interpolating a document.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Every problem found, so all missing variables are reported at once.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitute environment variables in `input`.
pub fn interpolate(input: &str) -> InterpolationResult {
    interpolate_with(input, |name| env::var(name).ok())
}

fn interpolate_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = PLACEHOLDER
        .replace_all(input, |caps: &Captures| {
            if caps.name("escape").is_some() {
                return "$".to_string();
            }

            let Some(name) = caps.name("braced").or_else(|| caps.name("bare")) else {
                return caps[0].to_string();
            };
            let name = name.as_str();
            let op = caps.name("op").map(|m| m.as_str());
            let fallback = caps.name("fallback").map(|m| m.as_str());

            match lookup(name) {
                Some(value) if value.contains(['\n', '\r']) => {
                    errors.push(format!(
                        "environment variable '{name}' contains newlines, which is not allowed"
                    ));
                    caps[0].to_string()
                }
                Some(value) if value.is_empty() && op == Some(":-") => {
                    fallback.unwrap_or_default().to_string()
                }
                Some(value) => value,
                None => match fallback {
                    Some(fallback) => fallback.to_string(),
                    None => {
                        errors.push(format!("environment variable '{name}' is not set"));
                        caps[0].to_string()
                    }
                },
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn run(input: &str, vars: &[(&str, &str)]) -> InterpolationResult {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        interpolate_with(input, |name| vars.get(name).cloned())
    }

    #[test]
    fn test_braced_and_bare_variables() {
        let result = run("in: ${INPUT_CSV}\nout: $OUTPUT_DIR", &[
            ("INPUT_CSV", "/data/tx.csv"),
            ("OUTPUT_DIR", "/data/partitions"),
        ]);
        assert!(result.is_ok());
        assert_eq!(result.text, "in: /data/tx.csv\nout: /data/partitions");
    }

    #[test]
    fn test_missing_variables_are_all_reported() {
        let result = run("${A} ${B}", &[]);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.text, "${A} ${B}");
    }

    #[test]
    fn test_colon_dash_fallback_covers_empty() {
        let result = run("${WRITERS:-16}", &[("WRITERS", "")]);
        assert_eq!(result.text, "16");
    }

    #[test]
    fn test_dash_fallback_keeps_empty() {
        let result = run("[${WRITERS-16}]", &[("WRITERS", "")]);
        assert_eq!(result.text, "[]");

        let result = run("[${WRITERS-16}]", &[]);
        assert_eq!(result.text, "[16]");
    }

    #[test]
    fn test_escape_sequence() {
        let result = run("price: $$5", &[]);
        assert!(result.is_ok());
        assert_eq!(result.text, "price: $5");
    }

    #[test]
    fn test_newline_values_rejected() {
        let result = run("${EVIL}", &[("EVIL", "a\nb: c")]);
        assert!(!result.is_ok());
        assert!(result.errors[0].contains("newlines"));
    }
}
