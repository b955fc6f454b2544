//! Verification Pass
//!
//! One extra model call that re-reads the candidate answer against the
//! original request and fixes its format. The model sees a single synthetic
//! system entry, never the full history.

use crate::error::{AgentError, Result};
use crate::message::{AssistantMessage, Message};
use crate::provider::BoundModel;
use crate::session::SessionState;

/// Build the single prompt the verification call receives
pub fn build_verification_prompt(context: &str, instructions: &str, request: &str, candidate: &str) -> String {
    format!(
        "# Context:\n{context}# Instructions to double check:\n{instructions}\n\n# Original User Request:\n{request} \n\n# AI message to format: {candidate}"
    )
}

pub struct VerificationPass<'a> {
    model: &'a BoundModel,
    instructions: String,
}

impl<'a> VerificationPass<'a> {
    pub fn new(model: &'a BoundModel, instructions: impl Into<String>) -> Self {
        Self {
            model,
            instructions: instructions.into(),
        }
    }

    /// Check the candidate answer, append the corrected entry, and return its text.
    pub async fn run(&self, state: &mut SessionState) -> Result<String> {
        let candidate = match state.history.last() {
            Some(Message::Assistant(reply)) => reply.content.clone(),
            _ => {
                return Err(AgentError::InvalidModelResponse(
                    "verification requires a candidate assistant answer".into(),
                ))
            }
        };
        let request = state
            .history
            .first_user_since(state.turn_start)
            .ok_or_else(|| AgentError::Session("no user request to verify against".into()))?
            .to_string();

        tracing::debug!(candidate = %candidate, "Verifying response");

        let prompt = build_verification_prompt("", &self.instructions, &request, &candidate);
        let completion = self.model.invoke(&[Message::system(prompt)]).await?;

        let checked = match completion.message {
            Message::Assistant(reply) => reply,
            other => {
                return Err(AgentError::InvalidModelResponse(format!(
                    "verification returned a {} entry",
                    other.role()
                )))
            }
        };
        let answer = checked.content.clone();
        state.history.push(Message::Assistant(AssistantMessage {
            tool_calls: Vec::new(),
            ..checked
        }))?;

        tracing::debug!(answer = %answer, "Response verified");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GenerationOptions;
    use crate::testing::{Scripted, ScriptedProvider};
    use std::sync::Arc;
    use std::time::Duration;

    fn bound(provider: Arc<ScriptedProvider>) -> BoundModel {
        BoundModel::new(provider, Vec::new(), GenerationOptions::default(), Duration::from_secs(5))
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_verification_prompt("", "Answer with a number only.", "What is 12.2 / 0.5?", "The answer is 24.4");
        assert_eq!(
            prompt,
            "# Context:\n# Instructions to double check:\nAnswer with a number only.\n\n# Original User Request:\nWhat is 12.2 / 0.5? \n\n# AI message to format: The answer is 24.4"
        );
    }

    #[tokio::test]
    async fn test_sends_single_synthetic_entry() {
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::answer("24.4")]));
        let model = bound(provider.clone());
        let mut state = SessionState::new();
        state.history.ensure_system("persona");
        state.history.push(Message::user("What is 12.2 divided by 0.5?")).unwrap();
        state.history.push(Message::assistant("The answer is twenty four point four")).unwrap();

        let answer = VerificationPass::new(&model, "numbers only").run(&mut state).await.unwrap();

        assert_eq!(answer, "24.4");
        assert_eq!(state.history.last(), Some(&Message::assistant("24.4")));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 1);
        let Message::System { content } = &requests[0][0] else {
            panic!("expected a system entry");
        };
        assert!(content.contains("numbers only"));
        assert!(content.contains("What is 12.2 divided by 0.5?"));
        assert!(content.contains("The answer is twenty four point four"));
    }

    #[tokio::test]
    async fn test_checks_against_current_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::answer("3")]));
        let model = bound(provider.clone());
        let mut state = SessionState::new();
        state.history.ensure_system("persona");
        state.history.push(Message::user("What is 1 + 1?")).unwrap();
        state.history.push(Message::assistant("2")).unwrap();
        state.turn_start = state.history.len();
        state.history.push(Message::user("And 1 + 2?")).unwrap();
        state.history.push(Message::assistant("That makes three")).unwrap();

        VerificationPass::new(&model, "numbers only").run(&mut state).await.unwrap();

        let prompt = provider.requests()[0][0].content().to_string();
        assert!(prompt.contains("# Original User Request:\nAnd 1 + 2?"));
        assert!(!prompt.contains("What is 1 + 1?"));
    }

    #[tokio::test]
    async fn test_rejects_non_assistant_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::reply(Message::user("??"))]));
        let model = bound(provider);
        let mut state = SessionState::new();
        state.history.push(Message::user("q")).unwrap();
        state.history.push(Message::assistant("a")).unwrap();

        let err = VerificationPass::new(&model, "check").run(&mut state).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidModelResponse(_)));
        assert_eq!(state.history.len(), 2);
    }
}
