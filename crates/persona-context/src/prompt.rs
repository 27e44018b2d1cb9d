// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persona prompt construction.
//!
//! Pure string builders: nothing here touches the store or the provider.

use chrono::SecondsFormat;
use persona_core::{MemoryEntry, PersonalityProfile, ProviderMessage, TurnRole};

/// Log prefixes written in front of agent turns, longest first.
const AVATAR_PREFIXES: [&str; 3] = ["Avatar (Direct Echo): ", "Avatar (Guided): ", "Avatar: "];

/// System prompt for a single-shot reply.
pub fn persona_system_prompt(
    profile: &PersonalityProfile,
    latest_activity: Option<&MemoryEntry>,
    relevant_memories: &[MemoryEntry],
) -> String {
    let activity = match latest_activity {
        Some(entry) => format!(
            "Right now (or recently), you were: {} (Time: {})",
            entry.content,
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        None => "You are currently hanging out.".to_string(),
    };
    let memories = relevant_memories
        .iter()
        .map(|m| format!("- {}", m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are NOT an AI. You are a human being living your life.\n\
         Never mention you are an AI, a language model, or an avatar.\n\
         If asked what you are doing, refer to your Recent Activity Context.\n\
         \n\
         Traits: {traits}\n\
         Dialect: {dialect}\n\
         Common Phrases: {phrases}\n\
         Filler Words Frequency (0-1): {filler}\n\
         Speech Rate: {rate}\n\
         \n\
         [Recent Activity Context]\n\
         {activity}\n\
         \n\
         [Relevant Past Memories]\n\
         {memories}\n\
         \n\
         Your goal is to reply to the user naturally, embodying this persona.\n\
         Do NOT be robotic. Use the filler words and dialect specified.",
        traits = profile.traits.join(", "),
        dialect = profile.effective_dialect(),
        phrases = profile.common_phrases.join(", "),
        filler = profile.filler_word_frequency,
        rate = profile.speech_rate,
    )
}

/// System prompt for rewriting an operator's draft in persona.
///
/// `intervention` is expected in `[0, 1]`; lower values ask for lighter edits.
pub fn rewrite_system_prompt(
    profile: &PersonalityProfile,
    intervention: f64,
    user_text: &str,
    operator_input: &str,
    latest_activity: Option<&MemoryEntry>,
) -> String {
    let state = latest_activity
        .map(|entry| format!("Your recent activity/state: {}", entry.content))
        .unwrap_or_default();

    format!(
        "You are a human being. NOT an AI.\n\
         Traits: {traits}\n\
         Dialect: {dialect}\n\
         \n\
         Intervention Level: {intervention:.2} (0-1).\n\
         Your operator (another part of your brain) is guiding what you say.\n\
         USER SAID: \"{user_text}\"\n\
         OPERATOR GUIDANCE: \"{operator_input}\"\n\
         \n\
         [Current State/Context]\n\
         {state}\n\
         \n\
         TASK: Rewrite the OPERATOR GUIDANCE to match your specific Persona, Dialect, and Style.\n\
         - If Intervention is 1.0: Fix facts, flow, and rewrite fully in character.\n\
         - If Intervention is lower: Change less, purely fix minor flow or style issues.\n\
         - Keep the core meaning / intent of the INPUT.",
        traits = profile.traits.join(", "),
        dialect = profile.effective_dialect(),
    )
}

/// The single user message sent alongside [`rewrite_system_prompt`].
pub fn rewrite_user_message(operator_input: &str) -> String {
    format!("Rewrite this to match your persona: \"{operator_input}\"")
}

/// Converts logged session turns plus the new user turn into provider messages.
///
/// Turns logged as `User: ...` become user messages and every other turn an
/// assistant message, with the log prefix stripped. Consecutive messages of
/// the same role are joined with a newline and leading assistant messages are
/// dropped, so the result alternates, starts with a user message, and ends
/// with `user_turn`.
pub fn history_to_messages(
    history: &[MemoryEntry],
    user_turn: &str,
    visual_context: Option<&str>,
) -> Vec<ProviderMessage> {
    let mut messages: Vec<ProviderMessage> = Vec::with_capacity(history.len() + 1);

    let final_turn = match visual_context {
        Some(visual) => format!("{user_turn}\n[Visual Context]: {visual}"),
        None => user_turn.to_string(),
    };
    let turns = history
        .iter()
        .map(|entry| split_turn(&entry.content))
        .chain(std::iter::once((TurnRole::User, final_turn.as_str())));

    for (role, body) in turns {
        let role = match role {
            TurnRole::User => "user",
            TurnRole::Avatar => "assistant",
        };
        if let Some(last) = messages.last_mut() {
            if last.role == role {
                last.content.push('\n');
                last.content.push_str(body);
                continue;
            }
        } else if role == "assistant" {
            continue;
        }
        messages.push(ProviderMessage {
            role: role.to_string(),
            content: body.to_string(),
        });
    }

    messages
}

fn split_turn(content: &str) -> (TurnRole, &str) {
    if let Some(body) = content.strip_prefix("User: ") {
        return (TurnRole::User, body);
    }
    for prefix in AVATAR_PREFIXES {
        if let Some(body) = content.strip_prefix(prefix) {
            return (TurnRole::Avatar, body);
        }
    }
    (TurnRole::Avatar, content)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use persona_core::MemoryKind;

    use super::*;

    fn turn(content: &str) -> MemoryEntry {
        MemoryEntry {
            seq: 0,
            subject_id: "alice".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 5, 4, 18, 30, 0).unwrap(),
            kind: MemoryKind::Text,
            session_id: Some("s1".into()),
            content: content.into(),
        }
    }

    fn observed_profile() -> PersonalityProfile {
        PersonalityProfile {
            traits: vec!["Casual".into(), "Observant".into()],
            common_phrases: vec!["you know".into()],
            filler_word_frequency: 0.4,
            speech_rate: "Fast".into(),
            dialect: Some("Scottish English".into()),
            ..PersonalityProfile::default()
        }
    }

    #[test]
    fn system_prompt_renders_persona_fields() {
        let prompt = persona_system_prompt(&observed_profile(), None, &[]);
        assert!(prompt.starts_with("You are NOT an AI."));
        assert!(prompt.contains("Traits: Casual, Observant\n"));
        assert!(prompt.contains("Dialect: Scottish English\n"));
        assert!(prompt.contains("Common Phrases: you know\n"));
        assert!(prompt.contains("Filler Words Frequency (0-1): 0.4\n"));
        assert!(prompt.contains("Speech Rate: Fast\n"));
        assert!(prompt.contains("You are currently hanging out."));
        assert!(prompt.ends_with("Use the filler words and dialect specified."));
    }

    #[test]
    fn system_prompt_falls_back_to_default_dialect() {
        let prompt = persona_system_prompt(&PersonalityProfile::default(), None, &[]);
        assert!(prompt.contains("Dialect: General American\n"));
    }

    #[test]
    fn system_prompt_includes_activity_and_memories() {
        let mut activity = turn("Cooking pasta");
        activity.kind = MemoryKind::Vision;
        let memories = vec![turn("I went hiking"), turn("User: mountains")];

        let prompt = persona_system_prompt(&observed_profile(), Some(&activity), &memories);
        assert!(prompt.contains(
            "Right now (or recently), you were: Cooking pasta (Time: 2025-05-04T18:30:00Z)"
        ));
        assert!(prompt.contains("[Relevant Past Memories]\n- I went hiking\n- User: mountains\n"));
    }

    #[test]
    fn rewrite_prompt_embeds_draft_and_state() {
        let mut activity = turn("Walking the dog");
        activity.kind = MemoryKind::Audio;
        let prompt = rewrite_system_prompt(
            &observed_profile(),
            0.5,
            "how are you?",
            "I'm fine",
            Some(&activity),
        );
        assert!(prompt.starts_with("You are a human being. NOT an AI."));
        assert!(prompt.contains("Intervention Level: 0.50 (0-1)."));
        assert!(prompt.contains("USER SAID: \"how are you?\""));
        assert!(prompt.contains("OPERATOR GUIDANCE: \"I'm fine\""));
        assert!(prompt.contains("Your recent activity/state: Walking the dog"));
        assert!(prompt.contains("Keep the core meaning / intent of the INPUT."));
    }

    #[test]
    fn rewrite_prompt_without_activity_leaves_state_blank() {
        let prompt =
            rewrite_system_prompt(&PersonalityProfile::default(), 1.0, "hi", "hello", None);
        assert!(prompt.contains("[Current State/Context]\n\n"));
        assert!(!prompt.contains("recent activity"));
    }

    #[test]
    fn rewrite_user_message_quotes_draft() {
        assert_eq!(
            rewrite_user_message("see you soon"),
            "Rewrite this to match your persona: \"see you soon\""
        );
    }

    #[test]
    fn history_maps_roles_and_strips_prefixes() {
        let history = vec![
            turn("User: hey"),
            turn("Avatar: hi there"),
            turn("User: what's up"),
            turn("Avatar (Guided): not much"),
        ];
        let messages = history_to_messages(&history, "cool", None);
        assert_eq!(
            messages,
            vec![
                ProviderMessage::user("hey"),
                ProviderMessage::assistant("hi there"),
                ProviderMessage::user("what's up"),
                ProviderMessage::assistant("not much"),
                ProviderMessage::user("cool"),
            ]
        );
    }

    #[test]
    fn history_coalesces_and_drops_leading_assistant() {
        let history = vec![
            turn("Avatar (Direct Echo): orphan"),
            turn("User: first"),
            turn("User: [Visual Context]: waving"),
        ];
        let messages = history_to_messages(&history, "second", Some("smiling"));
        assert_eq!(
            messages,
            vec![ProviderMessage::user(
                "first\n[Visual Context]: waving\nsecond\n[Visual Context]: smiling"
            )]
        );
    }

    #[test]
    fn empty_history_is_just_the_user_turn() {
        let messages = history_to_messages(&[], "hello", None);
        assert_eq!(messages, vec![ProviderMessage::user("hello")]);
    }

    #[test]
    fn unprefixed_turn_is_assistant() {
        let messages = history_to_messages(&[turn("User: a"), turn("legacy reply")], "b", None);
        assert_eq!(messages[1], ProviderMessage::assistant("legacy reply"));
    }
}
