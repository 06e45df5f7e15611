use std::future::Future;

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult};
use crate::prompt::{Input, InputType, Interrupted, Prompt};
use crate::providers::base::{Provider, ProviderError, ToolOffer};
use crate::providers::types::message::Message;
use crate::providers::types::tool::ToolCall;
use crate::tools::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingInput,
    RequestingCompletion,
    DispatchingTools,
    Stopped,
}

/// Why a session ended without a backend fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    UserExit,
    Interrupted,
    InputClosed,
}

enum Step<T> {
    Continue(T),
    Interrupted,
}

/// Agent drives the dialogue between a user, the model and the device tools
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    conversation: Conversation,
    state: AgentState,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, registry: ToolRegistry, system_prompt: &str) -> Self {
        Self {
            provider,
            registry,
            conversation: Conversation::new(system_prompt),
            state: AgentState::AwaitingInput,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run the session until the user leaves, Ctrl-C, or a backend fault.
    pub async fn run(&mut self, prompt: &mut dyn Prompt) -> AgentResult<StopReason> {
        self.run_until(prompt, async {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("unable to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Like [`Agent::run`], stopping when `shutdown` completes.
    pub async fn run_until<F>(&mut self, prompt: &mut dyn Prompt, shutdown: F) -> AgentResult<StopReason>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        prompt.ready().await;

        let result = loop {
            self.state = AgentState::AwaitingInput;

            let step = tokio::select! {
                _ = &mut shutdown => Step::Interrupted,
                raw = prompt.get_input() => Step::Continue(raw),
            };
            let raw = match step {
                Step::Interrupted => break Ok(StopReason::Interrupted),
                Step::Continue(Ok(raw)) => raw,
                Step::Continue(Err(e)) if e.is::<Interrupted>() => {
                    break Ok(StopReason::Interrupted)
                }
                Step::Continue(Err(e)) => {
                    tracing::info!(error = %e, "input closed");
                    break Ok(StopReason::InputClosed);
                }
            };

            let input = Input::classify(&raw);
            let text = match (input.input_type, input.content) {
                (InputType::Exit, _) => break Ok(StopReason::UserExit),
                (InputType::Message, Some(text)) => text,
                _ => continue,
            };

            prompt.show_busy();
            let step = tokio::select! {
                _ = &mut shutdown => Step::Interrupted,
                reply = self.reply(&text) => Step::Continue(reply),
            };
            prompt.hide_busy();

            match step {
                Step::Interrupted => break Ok(StopReason::Interrupted),
                Step::Continue(Ok(reply)) => prompt.render(&reply).await,
                Step::Continue(Err(e)) => {
                    tracing::error!(error = %e, "ending session");
                    break Err(e);
                }
            }
        };

        self.state = AgentState::Stopped;
        prompt.close();
        result
    }

    /// One full turn: the user's text in, the reply to show out.
    pub async fn reply(&mut self, text: &str) -> AgentResult<String> {
        self.push(Message::user(text))?;

        let decision = self.request_decision().await?;
        if !decision.has_tool_calls() {
            let content = decision.text().to_string();
            self.push(decision)?;
            return Ok(content);
        }

        let calls = decision.tool_calls.clone();
        self.push(decision)?;
        self.dispatch_tool_calls(&calls).await?;
        self.request_answer().await
    }

    /// First request of a turn, with every tool on offer.
    pub async fn request_decision(&mut self) -> AgentResult<Message> {
        self.state = AgentState::RequestingCompletion;
        let (message, _usage) = self
            .provider
            .complete(
                self.conversation.messages(),
                ToolOffer::Auto(self.registry.specs()),
            )
            .await?;
        Ok(message)
    }

    /// Run each requested tool in order and record every result.
    pub async fn dispatch_tool_calls(&mut self, calls: &[ToolCall]) -> AgentResult<()> {
        self.state = AgentState::DispatchingTools;
        for call in calls {
            tracing::info!(id = %call.id, tool = %call.name, arguments = %call.arguments, "dispatching tool call");
            let output = match self.registry.dispatch(&call.name, &call.arguments).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                    format!("Error: {}", e)
                }
            };
            self.push(Message::tool(&call.id, &call.name, &output))?;
        }
        Ok(())
    }

    /// Second request of a turn, answering from the tool results.
    pub async fn request_answer(&mut self) -> AgentResult<String> {
        self.state = AgentState::RequestingCompletion;
        let (message, _usage) = self
            .provider
            .complete(self.conversation.messages(), ToolOffer::Withheld)
            .await?;

        if message.has_tool_calls() {
            tracing::warn!(
                count = message.tool_calls.len(),
                "ignoring tool calls in the final answer"
            );
        }
        let content = message.content.ok_or_else(|| {
            ProviderError::MalformedResponse("final answer has no content".to_string())
        })?;

        self.push(Message::assistant(&content))?;
        Ok(content)
    }

    fn push(&mut self, message: Message) -> AgentResult<()> {
        self.conversation
            .push(message)
            .map_err(|e| AgentError::History(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use crate::tools::runner::RecordingRunner;
    use crate::tools::ToolSettings;
    use std::sync::Arc;

    fn agent(provider: &MockProvider) -> Agent {
        let registry = ToolRegistry::new(
            Arc::new(RecordingRunner::succeeding()),
            ToolSettings::default(),
        );
        Agent::new(Box::new(provider.clone()), registry, "You are a test agent.")
    }

    #[tokio::test]
    async fn test_reply_without_tools() {
        let provider = MockProvider::new(vec![Message::assistant("Hi there!")]);
        let mut agent = agent(&provider);

        assert_eq!(agent.reply("hello").await.unwrap(), "Hi there!");
        assert_eq!(agent.conversation().len(), 3);
        assert_eq!(agent.state(), AgentState::RequestingCompletion);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools_offered);
        assert_eq!(requests[0].messages.last(), Some(&Message::user("hello")));
    }

    #[tokio::test]
    async fn test_answer_without_content_is_backend_fault() {
        let call = ToolCall::new("call_1", "make_call", r#"{"phone_number": "555-0123"}"#);
        let provider = MockProvider::new(vec![
            Message::assistant_with_tool_calls(None, vec![call.clone()]).unwrap(),
            Message::assistant_with_tool_calls(None, vec![call]).unwrap(),
        ]);
        let mut agent = agent(&provider);

        let err = agent.reply("call 555-0123").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Backend(ProviderError::MalformedResponse(_))
        ));
        // user, assistant with call, tool result
        assert_eq!(agent.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_answer_ignores_extra_tool_calls() {
        let call = ToolCall::new("call_1", "make_call", r#"{"phone_number": "555-0123"}"#);
        let provider = MockProvider::new(vec![
            Message::assistant_with_tool_calls(None, vec![call.clone()]).unwrap(),
            Message::assistant_with_tool_calls(Some("Calling.".to_string()), vec![call]).unwrap(),
        ]);
        let mut agent = agent(&provider);

        assert_eq!(agent.reply("call 555-0123").await.unwrap(), "Calling.");
        let last = agent.conversation().last().unwrap();
        assert_eq!(last, &Message::assistant("Calling."));
    }
}
