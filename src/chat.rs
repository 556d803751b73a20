//! Canned replies for the support chat widget.

use crate::entitlements::TRIAL_DAYS;

/// Pick an automatic reply for a visitor message, if any keyword matches.
///
/// Topics are checked in order and the first match wins. Greetings only
/// match whole words, so "this" or "they" do not trigger one.
pub fn auto_reply(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if mentions(&["pricing", "price", "cost"]) {
        return Some(
            "You can view our pricing plans at /pricing.html. We offer Pro, Business, and \
             Lifetime plans with different features. Let me know if you have specific questions!"
                .to_string(),
        );
    }
    if mentions(&["plugin", "download"]) {
        return Some(
            "Our Pro members get access to 30+ premium plugins! You can browse them after \
             upgrading to a Pro or Business plan."
                .to_string(),
        );
    }
    if mentions(&["trial", "free"]) {
        return Some(format!(
            "Every new account starts with a {}-day free trial to test out JARVIS features. \
             No credit card required!",
            TRIAL_DAYS
        ));
    }
    if mentions(&["help", "support"]) {
        return Some(
            "I'm here to help! A support agent will be with you shortly. In the meantime, \
             you can check our FAQ page for common questions."
                .to_string(),
        );
    }

    let greeted = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| matches!(word, "hi" | "hello" | "hey"));
    greeted.then(|| "Hello! Thanks for reaching out. How can I assist you today?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_match_case_insensitively() {
        assert!(auto_reply("What does it COST?").unwrap().contains("pricing plans"));
        assert!(auto_reply("where do I download plugins").unwrap().contains("premium plugins"));
        assert!(auto_reply("Is there a free trial?").unwrap().contains("3-day free trial"));
        assert!(auto_reply("I need support").unwrap().contains("support agent"));
    }

    #[test]
    fn test_first_topic_wins() {
        // Mentions both price and trial; pricing is checked first.
        let reply = auto_reply("price after the trial?").unwrap();
        assert!(reply.contains("pricing plans"));
    }

    #[test]
    fn test_greetings_match_whole_words_only() {
        assert!(auto_reply("Hey there").unwrap().starts_with("Hello!"));
        assert!(auto_reply("hi!").is_some());
        assert_eq!(auto_reply("this thing is broken"), None);
        assert_eq!(auto_reply("they said so"), None);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(auto_reply("my microphone stopped working"), None);
    }
}
