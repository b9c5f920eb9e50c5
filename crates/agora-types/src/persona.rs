//! AI persona types for Agora.
//!
//! A persona is loaded from a profile file named `NNN_Name.md`: the ordinal
//! prefix yields the stable `user_id` (`ai_NNN`) and the remainder the
//! display name. The file body is the persona's system prompt.

use serde::{Deserialize, Serialize};

/// Stable author ID of the hardcoded fallback persona.
pub const FALLBACK_USER_ID: &str = "ai_system";

/// Display name of the hardcoded fallback persona.
pub const FALLBACK_NAME: &str = "System";

/// A named AI persona with its own system prompt and stable author identity.
///
/// Invariants: `system_prompt` is non-empty and `user_id` is unique within
/// a loaded directory (both enforced at load time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Source profile filename (e.g. `001_Luna.md`).
    pub file_name: String,
    /// Display name derived from the filename.
    pub name: String,
    /// Stable author ID derived from the filename ordinal (`ai_001`).
    pub user_id: String,
    /// System prompt text (the profile file body).
    pub system_prompt: String,
}

impl Persona {
    /// The hardcoded fallback persona, used when the persona directory is
    /// empty or a selection cannot be made.
    pub fn fallback() -> Self {
        Persona {
            file_name: String::new(),
            name: FALLBACK_NAME.to_string(),
            user_id: FALLBACK_USER_ID.to_string(),
            system_prompt: "You are the community assistant. Reply briefly, \
                            warmly, and helpfully."
                .to_string(),
        }
    }
}

/// Split a profile filename into `(display_name, user_id)`.
///
/// `001_Luna.md` -> `("Luna", "ai_001")`. A filename without an underscore
/// uses the whole stem for both parts (`Luna.md` -> `("Luna", "ai_Luna")`).
/// Returns `None` for non-`.md` files.
pub fn parse_profile_filename(file_name: &str) -> Option<(String, String)> {
    let stem = file_name.strip_suffix(".md")?;
    if stem.is_empty() {
        return None;
    }
    match stem.split_once('_') {
        Some((ordinal, name)) if !ordinal.is_empty() && !name.is_empty() => {
            Some((name.to_string(), format!("ai_{ordinal}")))
        }
        _ => Some((stem.to_string(), format!("ai_{stem}"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_filename_ordinal() {
        let (name, user_id) = parse_profile_filename("001_Luna.md").unwrap();
        assert_eq!(name, "Luna");
        assert_eq!(user_id, "ai_001");
    }

    #[test]
    fn test_parse_profile_filename_name_with_underscores() {
        let (name, user_id) = parse_profile_filename("012_Dr_Finch.md").unwrap();
        assert_eq!(name, "Dr_Finch");
        assert_eq!(user_id, "ai_012");
    }

    #[test]
    fn test_parse_profile_filename_no_ordinal() {
        let (name, user_id) = parse_profile_filename("Luna.md").unwrap();
        assert_eq!(name, "Luna");
        assert_eq!(user_id, "ai_Luna");
    }

    #[test]
    fn test_parse_profile_filename_rejects_non_md() {
        assert!(parse_profile_filename("001_Luna.txt").is_none());
        assert!(parse_profile_filename(".md").is_none());
    }

    #[test]
    fn test_fallback_persona_invariants() {
        let p = Persona::fallback();
        assert_eq!(p.user_id, FALLBACK_USER_ID);
        assert!(!p.system_prompt.trim().is_empty());
    }
}
