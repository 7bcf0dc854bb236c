use super::VariableEntry;
use std::collections::BTreeMap;

pub const NAME_REQUIRED_MESSAGE: &str = "Name cannot be empty";
pub const NAME_CHARSET_MESSAGE: &str = "Name contains invalid characters. Must only contain alphanumeric characters, \"-\", \"_\", \".\" and cannot start with a digit.";

/// Check one name against the rules every committable row must satisfy:
/// non-empty after trimming, alphanumeric plus `-`, `_`, `.`, and not
/// starting with a digit.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(NAME_REQUIRED_MESSAGE.to_string());
    }
    if !name_charset_ok(name) {
        return Err(NAME_CHARSET_MESSAGE.to_string());
    }
    Ok(())
}

fn name_charset_ok(name: &str) -> bool {
    let starts_with_digit = name
        .chars()
        .next()
        .map_or(false, |first| first.is_ascii_digit());
    if starts_with_digit {
        return false;
    }
    name.chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

/// Per-row validation state. The exemption for the trailing empty row is
/// positional: it applies to whichever row is last *and* unnamed right now,
/// and is re-evaluated on every call rather than attached to a row identity.
pub fn validation_errors(rows: &[VariableEntry]) -> BTreeMap<usize, String> {
    let mut errors = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        let exempt = index + 1 == rows.len() && !row.has_name();
        if exempt {
            continue;
        }
        if let Err(message) = validate_name(&row.name) {
            errors.insert(index, message);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{VariableEntry, VariableValue};

    fn named(name: &str) -> VariableEntry {
        VariableEntry::new(name, VariableValue::text("v"))
    }

    #[test]
    fn accepts_typical_names() {
        for name in ["API_KEY", "base-url", "a.b.c", "_private", "x1"] {
            assert!(validate_name(name).is_ok(), "expected `{name}` to pass");
        }
    }

    #[test]
    fn rejects_bad_names() {
        assert_eq!(
            validate_name("  ").expect_err("blank"),
            NAME_REQUIRED_MESSAGE
        );
        assert_eq!(
            validate_name("1bad").expect_err("leading digit"),
            NAME_CHARSET_MESSAGE
        );
        assert_eq!(
            validate_name("has space").expect_err("space"),
            NAME_CHARSET_MESSAGE
        );
        assert_eq!(
            validate_name("semi;colon").expect_err("punct"),
            NAME_CHARSET_MESSAGE
        );
    }

    #[test]
    fn trailing_unnamed_row_is_exempt() {
        let rows = vec![named("A"), named("")];
        assert!(validation_errors(&rows).is_empty());
    }

    #[test]
    fn unnamed_row_mid_list_is_an_error() {
        let rows = vec![named("A"), named(""), named("C")];
        let errors = validation_errors(&rows);
        assert_eq!(errors.get(&1).map(String::as_str), Some(NAME_REQUIRED_MESSAGE));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn exemption_follows_position_not_identity() {
        let empty = named("");
        let with_tail = vec![named("A"), empty.clone(), named("C")];
        assert!(validation_errors(&with_tail).contains_key(&1));

        // Same row, now last: the error clears without editing the row.
        let as_last = vec![named("A"), empty];
        assert!(validation_errors(&as_last).is_empty());
    }
}
