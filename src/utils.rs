//! Small string helpers.

use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static SNAKE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Convert camelCase strings to snake_case.
///
/// Idempotent on input that is already snake_case.
pub fn camel_to_snake(label: &str) -> String {
    let label = CAMEL_BOUNDARY.replace_all(label, "${1}_${2}");
    let label = SNAKE_BOUNDARY.replace_all(&label, "${1}_${2}");
    label.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_snake() {
        let cases = [
            ("FooBarBaz", "foo_bar_baz"),
            ("fooBarBaz", "foo_bar_baz"),
            ("FOOBarBaz", "foo_bar_baz"),
            ("foo_bar_baz", "foo_bar_baz"),
            ("foo_bar_BAZ", "foo_bar_baz"),
            ("_foo_bar_baz", "_foo_bar_baz"),
            ("fooBARbaz", "foo_ba_rbaz"),
            ("FOOBARBAZ", "foobarbaz"),
            ("Foo1Bar2Baz3", "foo1_bar2_baz3"),
            ("123", "123"),
            ("1_2_3", "1_2_3"),
        ];

        for (arg, expected) in cases {
            assert_eq!(camel_to_snake(arg), expected, "input: {arg}");
        }
    }

    #[test]
    fn test_camel_to_snake_idempotent() {
        let once = camel_to_snake("activePower");
        assert_eq!(once, "active_power");
        assert_eq!(camel_to_snake(&once), once);
    }
}
