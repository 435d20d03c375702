//! Admin allowlist for the master bot.
//!
//! Deny-by-default: an empty `admins` list means nobody can drive the relay.

/// Returns `true` when the Telegram user may use the bot.
pub fn is_admin(admins: &[i64], user_id: u64) -> bool {
    i64::try_from(user_id)
        .map(|id| admins.contains(&id))
        .unwrap_or(false)
}

/// The chat that receives messages from unlinked slave chats: the first
/// admin's private chat.
pub fn default_chat(admins: &[i64]) -> Option<String> {
    admins.first().map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_denies_all() {
        assert!(!is_admin(&[], 111));
    }

    #[test]
    fn listed_ids_are_allowed() {
        let admins = [123_456_789, 42];
        assert!(is_admin(&admins, 123_456_789));
        assert!(is_admin(&admins, 42));
        assert!(!is_admin(&admins, 43));
    }

    #[test]
    fn oversized_id_is_denied() {
        assert!(!is_admin(&[-1], u64::MAX));
    }

    #[test]
    fn first_admin_is_default_chat() {
        assert_eq!(default_chat(&[7, 8]).as_deref(), Some("7"));
        assert_eq!(default_chat(&[]), None);
    }
}
