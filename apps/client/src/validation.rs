use std::sync::LazyLock;

use regex::Regex;

use crate::error::InputError;

const MAX_NAME_CHARS: usize = 10;

/// Hangul syllables, ASCII letters and digits only.
fn player_name_pattern() -> &'static Regex {
    static PLAYER_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^[가-힣A-Za-z0-9]+$").unwrap()
    });
    &PLAYER_NAME_REGEX
}

/// Trim and validate a player name, returning the trimmed form.
pub fn validate_player_name(raw: &str) -> Result<String, InputError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(InputError::InvalidName {
            reason: "name must not be empty",
        });
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(InputError::InvalidName {
            reason: "name must be at most 10 characters",
        });
    }
    if !player_name_pattern().is_match(name) {
        return Err(InputError::InvalidName {
            reason: "name may only contain letters and digits",
        });
    }
    Ok(name.to_string())
}
