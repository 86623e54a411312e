//! Decides whether an incoming message should get an AI reply.

/// The slice of an incoming message the trigger decision needs.
pub struct Incoming<'a> {
    pub is_private: bool,
    pub text: &'a str,
    /// Handle (username) of the author of the replied-to message, if any.
    pub reply_author: Option<&'a str>,
}

/// True when the bot should answer: private chat, @mention, or a reply to
/// one of the bot's own messages. `handle` is the username resolved at
/// startup; when that call failed it is `None` and only private chats match.
pub fn should_reply(msg: &Incoming, handle: Option<&str>) -> bool {
    if msg.is_private {
        return true;
    }
    let Some(handle) = handle else {
        return false;
    };
    if msg.text.contains(&format!("@{handle}")) {
        return true;
    }
    msg.reply_author == Some(handle)
}

/// Strip the bot's @mention from the text and trim the rest.
pub fn clean_query(text: &str, handle: Option<&str>) -> String {
    match handle {
        Some(h) => text.replace(&format!("@{h}"), "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANDLE: Option<&str> = Some("geveze_bot");

    fn group(text: &str) -> Incoming<'_> {
        Incoming { is_private: false, text, reply_author: None }
    }

    #[test]
    fn test_private_always_triggers() {
        let msg = Incoming { is_private: true, text: "selam", reply_author: None };
        assert!(should_reply(&msg, HANDLE));
        // Even with no resolved handle
        assert!(should_reply(&msg, None));
    }

    #[test]
    fn test_group_requires_mention() {
        assert!(!should_reply(&group("selam millet"), HANDLE));
        assert!(should_reply(&group("selam @geveze_bot nasılsın"), HANDLE));
    }

    #[test]
    fn test_mention_is_substring_match() {
        // Mid-word occurrence still counts, matching the observed behavior
        assert!(should_reply(&group("x@geveze_boty"), HANDLE));
    }

    #[test]
    fn test_reply_to_bot_triggers() {
        let msg = Incoming {
            is_private: false,
            text: "katılmıyorum",
            reply_author: Some("geveze_bot"),
        };
        assert!(should_reply(&msg, HANDLE));
    }

    #[test]
    fn test_reply_to_other_user_does_not_trigger() {
        let msg = Incoming {
            is_private: false,
            text: "katılmıyorum",
            reply_author: Some("alice"),
        };
        assert!(!should_reply(&msg, HANDLE));
    }

    #[test]
    fn test_unresolved_handle_never_matches_in_groups() {
        let msg = Incoming {
            is_private: false,
            text: "selam @geveze_bot",
            reply_author: Some("geveze_bot"),
        };
        assert!(!should_reply(&msg, None));
    }

    #[test]
    fn test_clean_query_strips_mention() {
        assert_eq!(clean_query("@geveze_bot naber", HANDLE), "naber");
        assert_eq!(clean_query("naber @geveze_bot", HANDLE), "naber");
        assert_eq!(clean_query("  naber  ", None), "naber");
    }

    #[test]
    fn test_clean_query_can_be_empty() {
        assert_eq!(clean_query("@geveze_bot", HANDLE), "");
    }
}
