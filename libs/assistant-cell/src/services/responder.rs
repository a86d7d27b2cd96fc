// libs/assistant-cell/src/services/responder.rs
use regex::Regex;
use tracing::{debug, warn};

use crate::models::{AssistantError, ChatReply, Topic};

pub const MAX_MESSAGE_LENGTH: usize = 2000;

const FALLBACK_REPLY: &str = "I'm not sure I understood that. If something is bothering you, \
    the best next step is to book an appointment so a doctor can take a proper look.";

struct TopicRule {
    topic: Topic,
    keywords: &'static [&'static str],
    reply: &'static str,
    urgent: bool,
}

// First match wins. Emergency rules must stay at the top.
const RULES: &[TopicRule] = &[
    TopicRule {
        topic: Topic::Emergency,
        keywords: &[
            "chest pain",
            "difficulty breathing",
            "can't breathe",
            "cannot breathe",
            "unconscious",
            "fainted",
            "severe bleeding",
            "stroke",
            "seizure",
            "suicidal",
            "overdose",
        ],
        reply: "This sounds like it could be an emergency. Please call your local emergency \
            number or go to the nearest emergency department now.",
        urgent: true,
    },
    TopicRule {
        topic: Topic::Fever,
        keywords: &["fever", "temperature", "chills", "feverish"],
        reply: "Rest, drink plenty of fluids and keep track of your temperature. If the fever \
            lasts more than three days or goes above 39.5°C, book an appointment with a doctor.",
        urgent: false,
    },
    TopicRule {
        topic: Topic::Headache,
        keywords: &["headache", "migraine", "head hurts"],
        reply: "Try resting in a quiet, dark room and staying hydrated. Recurring or unusually \
            severe headaches are worth discussing with a doctor.",
        urgent: false,
    },
    TopicRule {
        topic: Topic::Respiratory,
        keywords: &["cough", "sore throat", "runny nose", "congestion", "flu", "cold"],
        reply: "Most coughs and colds clear up within a week or two. If you have a high fever, \
            trouble breathing or symptoms that keep getting worse, book a consultation.",
        urgent: false,
    },
    TopicRule {
        topic: Topic::Digestive,
        keywords: &["stomach", "nausea", "vomiting", "diarrhea", "diarrhoea", "constipation"],
        reply: "Sip water or an oral rehydration solution and eat light meals. Persistent pain, \
            blood or dehydration should be seen by a doctor.",
        urgent: false,
    },
    TopicRule {
        topic: Topic::Sleep,
        keywords: &["sleep", "insomnia", "tired", "fatigue", "exhausted"],
        reply: "Keeping a regular sleep schedule and limiting screens before bed often helps. \
            If tiredness lasts for weeks, a check-up can rule out underlying causes.",
        urgent: false,
    },
    TopicRule {
        topic: Topic::MentalHealth,
        keywords: &["anxiety", "anxious", "stress", "stressed", "depressed", "depression", "panic"],
        reply: "You're not alone in feeling this way. Talking to a professional can make a real \
            difference, and you can book a confidential appointment at any time.",
        urgent: false,
    },
    TopicRule {
        topic: Topic::Appointments,
        keywords: &["appointment", "book", "booking", "reschedule", "cancel", "doctor"],
        reply: "You can request, reschedule or cancel appointments from the Appointments page. \
            Your doctor will confirm the request once it has been reviewed.",
        urgent: false,
    },
    TopicRule {
        topic: Topic::Greeting,
        keywords: &["hello", "hi", "hey", "good morning", "good evening"],
        reply: "Hello! I can share general health tips or help you with your appointments. \
            What would you like to know?",
        urgent: false,
    },
];

struct CompiledRule {
    pattern: Regex,
    rule: &'static TopicRule,
}

/// Keyword-driven assistant. Gives general guidance only and never diagnoses.
pub struct RuleBasedResponder {
    rules: Vec<CompiledRule>,
}

impl RuleBasedResponder {
    pub fn new() -> Result<Self, AssistantError> {
        let rules = RULES
            .iter()
            .map(|rule| -> Result<CompiledRule, AssistantError> {
                Ok(CompiledRule {
                    pattern: keyword_pattern(rule.keywords)?,
                    rule,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn respond(&self, message: &str) -> Result<ChatReply, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::ValidationError("Message cannot be empty".to_string()));
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(AssistantError::ValidationError(format!(
                "Message cannot exceed {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        let matched = self.rules.iter().find(|compiled| compiled.pattern.is_match(message));

        let reply = match matched {
            Some(CompiledRule { rule, .. }) => {
                if rule.urgent {
                    warn!("Emergency keywords detected in assistant message");
                }
                ChatReply {
                    reply: rule.reply.to_string(),
                    topic: rule.topic,
                    urgent: rule.urgent,
                }
            }
            None => ChatReply {
                reply: FALLBACK_REPLY.to_string(),
                topic: Topic::General,
                urgent: false,
            },
        };

        debug!("Assistant matched topic {:?}", reply.topic);
        Ok(reply)
    }
}

/// Builds `(?i)\b(?:kw1|kw2)\b`, letting multi-word keywords match across any whitespace.
fn keyword_pattern(keywords: &[&str]) -> Result<Regex, regex::Error> {
    let alternatives = keywords
        .iter()
        .map(|keyword| {
            keyword
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives))
}
