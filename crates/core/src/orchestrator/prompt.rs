use roamer_model::{ModelMessage, ModelRequest};

use crate::conversation::Session;
use crate::tool::DisplayLocations;

/// Renders the session as the single text payload the model sees.
///
/// Every turn becomes a `Role: message` line, so the newest input ends up
/// last. Document texts trail the history in upload order.
pub(crate) fn build_model_request(
    session: &Session,
    system_prompt: Option<&str>,
) -> ModelRequest {
    let mut prompt = session
        .snapshot()
        .iter()
        .map(|turn| format!("{}: {}", turn.role(), turn.message()))
        .collect::<Vec<_>>()
        .join("\n");

    if !session.documents().is_empty() {
        let uploaded = session
            .documents()
            .iter()
            .map(|doc| doc.text())
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push_str("\nUser uploaded details:\n");
        prompt.push_str(&uploaded);
    }

    let mut messages = Vec::with_capacity(2);
    if let Some(system_prompt) = system_prompt {
        messages.push(ModelMessage::System(system_prompt.to_owned()));
    }
    messages.push(ModelMessage::User(prompt));

    ModelRequest {
        messages,
        tools: vec![DisplayLocations::definition()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Turn;

    #[test]
    fn test_history_lines() {
        let mut session = Session::new();
        session.append(Turn::user("Best time for Kyoto?"));
        session.append(Turn::assistant("Late autumn."));
        session.append(Turn::user("And Osaka?"));

        let req = build_model_request(&session, Some("Be brief."));
        assert_eq!(
            req.messages,
            vec![
                ModelMessage::System("Be brief.".to_owned()),
                ModelMessage::User(
                    "User: Best time for Kyoto?\n\
                     Assistant: Late autumn.\n\
                     User: And Osaka?"
                        .to_owned()
                ),
            ]
        );
        assert_eq!(req.tools.len(), 1);
        assert_eq!(req.tools[0].name, "displayLocations");
    }

    #[test]
    fn test_documents_trail_history() {
        let mut session = Session::new();
        session.put_document("jan.pdf", "Hotel 300 EUR");
        session.put_document("feb.pdf", "Train 80 EUR");
        session.append(Turn::user("Am I over budget?"));

        let req = build_model_request(&session, None);
        assert_eq!(
            req.messages,
            vec![ModelMessage::User(
                "User: Am I over budget?\n\
                 User uploaded details:\n\
                 Hotel 300 EUR\n\
                 Train 80 EUR"
                    .to_owned()
            )]
        );
    }
}
