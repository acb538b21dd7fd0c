use serde_json::{json, Value};

/// Example phrasings per domain, in classifier priority order.
pub const EXAMPLES: &[(&str, &[&str])] = &[
    (
        "workflows",
        &[
            "list my workflows",
            "run workflow ABCDEFGH12345678 with {\"customer\": \"acme\"}",
            "show workflow ABCDEFGH12345678",
            "delete workflow ABCDEFGH12345678",
            "delete all inactive workflows",
        ],
    ),
    (
        "files",
        &["list my files", "analyze report.csv", "search my files for \"invoice\""],
    ),
    (
        "deployments",
        &["list my services", "deploy srv-abc123", "status of deployment srv-abc123"],
    ),
    ("database", &["show 10 records from table tblCustomers"]),
    ("email", &["send an email to ops@example.com subject: Report, content: \"All green\""]),
    ("security", &["run a security audit"]),
    ("conversation", &["show the conversation history", "reset the conversation"]),
];

pub fn examples() -> Value {
    let domains = EXAMPLES
        .iter()
        .map(|(domain, phrases)| json!({ "domain": domain, "examples": phrases }))
        .collect::<Vec<_>>();
    json!({ "domains": domains })
}

#[cfg(test)]
mod tests {
    use switchboard_core::IntentKind;

    use super::EXAMPLES;
    use crate::classifier::{IntentClassifier, RequestContext};

    #[test]
    fn every_example_routes_to_a_specific_intent() {
        let classifier = IntentClassifier::new();
        for (domain, phrases) in EXAMPLES {
            for phrase in *phrases {
                let intent = classifier.classify(phrase, &RequestContext::default());
                assert_ne!(
                    intent.kind,
                    IntentKind::GenericConversation,
                    "{domain} example should not fall through: {phrase}"
                );
            }
        }
    }
}
