//! Usage hints appended after failed commands.

/// Hint for input that still contains placeholder brackets from a usage
/// string, e.g. `/kick {player}` typed verbatim.
pub const PLACEHOLDER_HINT: &str =
    "Brackets mark placeholders: replace {value} or [value] with an actual value, without the brackets.";

/// Generic pointer shown for any other failed command.
pub const GENERIC_HINT: &str = "See /help for a list of commands and their usage.";

/// Pick the hint for a failed command's raw input.
pub fn hint_for(raw: &str) -> &'static str {
    if raw.contains(['{', '}', '[', ']']) {
        PLACEHOLDER_HINT
    } else {
        GENERIC_HINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_select_placeholder_hint() {
        assert_eq!(hint_for("/kick {player}"), PLACEHOLDER_HINT);
        assert_eq!(hint_for("/give [item] 3"), PLACEHOLDER_HINT);
        assert_eq!(hint_for("/say }"), PLACEHOLDER_HINT);
    }

    #[test]
    fn plain_input_gets_generic_hint() {
        assert_eq!(hint_for("/kick bob"), GENERIC_HINT);
        assert_eq!(hint_for("/halp"), GENERIC_HINT);
    }
}
