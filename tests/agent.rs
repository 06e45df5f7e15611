use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use tna::agent::{Agent, AgentState, StopReason};
use tna::conversation;
use tna::errors::AgentError;
use tna::prompt::{Interrupted, Prompt};
use tna::providers::base::{Provider, ProviderError, ToolOffer, Usage};
use tna::providers::mock::MockProvider;
use tna::providers::types::message::{Message, Role};
use tna::providers::types::tool::ToolCall;
use tna::tools::runner::RecordingRunner;
use tna::tools::{ToolRegistry, ToolSettings};

/// Feeds canned utterances and records what the agent shows.
#[derive(Default)]
struct ScriptedPrompt {
    inputs: VecDeque<String>,
    rendered: Vec<String>,
    busy: bool,
    busy_count: usize,
    closed: bool,
    /// Never answer once the script runs out
    hang_when_done: bool,
    /// Report a Ctrl-C once the script runs out
    interrupt_when_done: bool,
}

impl ScriptedPrompt {
    fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn get_input(&mut self) -> Result<String> {
        match self.inputs.pop_front() {
            Some(input) => Ok(input),
            None if self.hang_when_done => std::future::pending().await,
            None if self.interrupt_when_done => Err(Interrupted.into()),
            None => Err(anyhow!("script finished")),
        }
    }

    async fn render(&mut self, text: &str) {
        self.rendered.push(text.to_string());
    }

    fn show_busy(&mut self) {
        self.busy = true;
        self.busy_count += 1;
    }

    fn hide_busy(&mut self) {
        self.busy = false;
    }

    fn close(&self) {}
}

/// A backend that never answers.
struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    async fn complete(
        &self,
        _messages: &[Message],
        _offer: ToolOffer<'_>,
    ) -> Result<(Message, Usage), ProviderError> {
        std::future::pending().await
    }
}

fn agent(provider: &MockProvider, runner: &RecordingRunner) -> Agent {
    let registry = ToolRegistry::new(Arc::new(runner.clone()), ToolSettings::default());
    Agent::new(Box::new(provider.clone()), registry, "You are a test agent.")
}

fn tool_calls(calls: Vec<ToolCall>) -> Message {
    Message::assistant_with_tool_calls(None, calls).unwrap()
}

#[tokio::test]
async fn test_exit_words_end_session_without_requests() {
    for word in ["exit", "quit", "EXIT", "Quit", "  exit  "] {
        let provider = MockProvider::new(vec![]);
        let runner = RecordingRunner::succeeding();
        let mut agent = agent(&provider, &runner);
        let mut prompt = ScriptedPrompt::new(&[word, "hello"]);

        let reason = agent.run(&mut prompt).await.unwrap();

        assert_eq!(reason, StopReason::UserExit);
        assert_eq!(agent.state(), AgentState::Stopped);
        assert!(provider.requests().is_empty(), "{word:?} reached the backend");
        assert_eq!(agent.conversation().len(), 1);
    }
}

#[tokio::test]
async fn test_empty_input_is_ignored() {
    let provider = MockProvider::new(vec![Message::assistant("Hi!")]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt::new(&["", "   ", "hello", "quit"]);

    agent.run(&mut prompt).await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(prompt.rendered, vec!["Hi!"]);
}

#[tokio::test]
async fn test_plain_reply_is_delivered_verbatim() {
    let reply = "It's **sunny** today.";
    let provider = MockProvider::new(vec![Message::assistant(reply)]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt::new(&["  what's the weather?  ", "exit"]);

    agent.run(&mut prompt).await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].tools_offered);
    assert_eq!(
        requests[0].tools,
        vec![
            "execute_shell",
            "make_call",
            "send_sms",
            "launch_app",
            "inspect_surroundings",
            "remember_fact",
            "recall_fact"
        ]
    );
    // The user message is in history before the request goes out.
    assert_eq!(
        requests[0].messages.last(),
        Some(&Message::user("what's the weather?"))
    );

    let history = agent.conversation().messages();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2], Message::assistant(reply));
    assert_eq!(prompt.rendered, vec![reply]);
    assert_eq!(prompt.busy_count, 1);
    assert!(!prompt.busy);
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_tool_calls_dispatched_in_order() {
    let provider = MockProvider::new(vec![
        tool_calls(vec![
            ToolCall::new("call_1", "make_call", r#"{"phone_number": "555-0123"}"#),
            ToolCall::new(
                "call_2",
                "send_sms",
                r#"{"phone_number": "555-0123", "message": "Hello"}"#,
            ),
        ]),
        Message::assistant("Called and texted 555-0123."),
    ]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);

    let reply = agent.reply("call and text 555-0123").await.unwrap();
    assert_eq!(reply, "Called and texted 555-0123.");

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].program, "termux-telephony-call");
    assert_eq!(invocations[0].args, vec!["555-0123"]);
    assert_eq!(invocations[0].timeout, Duration::from_secs(30));
    assert_eq!(invocations[1].program, "termux-sms-send");
    assert_eq!(invocations[1].args, vec!["-n", "555-0123", "Hello"]);

    let history = agent.conversation().messages();
    // system, user, assistant with calls, two tool results, final answer
    assert_eq!(history.len(), 6);
    assert_eq!(
        history[3],
        Message::tool("call_1", "make_call", "Call initiated to 555-0123")
    );
    assert_eq!(
        history[4],
        Message::tool("call_2", "send_sms", "SMS sent to 555-0123")
    );
    assert_eq!(history[5], Message::assistant("Called and texted 555-0123."));

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].tools_offered);
    assert!(!requests[1].tools_offered);
    assert!(requests[1].tools.is_empty());
    assert_eq!(requests[1].messages.len(), 5);
}

#[tokio::test]
async fn test_tool_failures_become_results() {
    let provider = MockProvider::new(vec![
        tool_calls(vec![
            ToolCall::new("call_1", "fly_drone", "{}"),
            ToolCall::new("call_2", "make_call", "{not json"),
            ToolCall::new("call_3", "make_call", r#"{"phone_number": "555-0123"}"#),
        ]),
        Message::assistant("I could only place the call."),
    ]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);

    let reply = agent.reply("do things").await.unwrap();
    assert_eq!(reply, "I could only place the call.");

    let history = agent.conversation().messages();
    assert_eq!(history[3].text(), "Error: Unknown tool: fly_drone");
    assert!(history[4].text().starts_with("Error: Invalid parameters: "));
    assert_eq!(history[5].text(), "Call initiated to 555-0123");
    assert_eq!(runner.invocations().len(), 1);
}

#[tokio::test]
async fn test_session_continues_after_unknown_tool() {
    let provider = MockProvider::new(vec![
        tool_calls(vec![ToolCall::new("call_1", "fly_drone", "{}")]),
        Message::assistant("I can't fly drones."),
        Message::assistant("Hello again."),
    ]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt::new(&["fly my drone", "hi", "quit"]);

    let reason = agent.run(&mut prompt).await.unwrap();

    assert_eq!(reason, StopReason::UserExit);
    assert_eq!(prompt.rendered, vec!["I can't fly drones.", "Hello again."]);
}

#[tokio::test]
async fn test_shell_tool_round_trip() {
    let provider = MockProvider::new(vec![
        tool_calls(vec![ToolCall::new(
            "call_1",
            "execute_shell",
            r#"{"command": "echo test"}"#,
        )]),
        Message::assistant("It printed test."),
    ]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);

    agent.reply("run echo test").await.unwrap();

    let invocations = runner.invocations();
    assert_eq!(invocations[0].program, "sh");
    assert_eq!(invocations[0].args, vec!["-c", "echo test"]);
    assert_eq!(invocations[0].timeout, Duration::from_secs(10));
    assert_eq!(
        agent.conversation().messages()[3].text(),
        "STDOUT: \nSTDERR: "
    );
}

#[tokio::test]
async fn test_backend_fault_ends_session() {
    let provider = MockProvider::with_results(vec![
        Ok(Message::assistant("First answer.")),
        Err("connection reset".to_string()),
    ]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt::new(&["one", "two", "three"]);

    let err = agent.run(&mut prompt).await.unwrap_err();

    assert!(matches!(
        err,
        AgentError::Backend(ProviderError::MalformedResponse(_))
    ));
    assert_eq!(agent.state(), AgentState::Stopped);
    assert_eq!(provider.requests().len(), 2);
    assert_eq!(prompt.rendered, vec!["First answer."]);
    assert!(!prompt.busy);
}

#[tokio::test]
async fn test_second_request_fault_ends_session() {
    let provider = MockProvider::with_results(vec![
        Ok(tool_calls(vec![ToolCall::new(
            "call_1",
            "make_call",
            r#"{"phone_number": "555-0123"}"#,
        )])),
        Err("bad gateway".to_string()),
    ]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt::new(&["call 555-0123"]);

    assert!(agent.run(&mut prompt).await.is_err());
    // The call already happened and its result is on record.
    assert_eq!(runner.invocations().len(), 1);
    assert_eq!(agent.conversation().len(), 4);
    assert!(prompt.rendered.is_empty());
}

#[tokio::test]
async fn test_interrupt_while_waiting_for_input() {
    let provider = MockProvider::new(vec![Message::assistant("Hi!")]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt {
        hang_when_done: true,
        ..ScriptedPrompt::new(&["hello"])
    };

    let reason = agent
        .run_until(&mut prompt, tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(agent.state(), AgentState::Stopped);
    assert_eq!(prompt.rendered, vec!["Hi!"]);
}

#[tokio::test]
async fn test_interrupt_while_awaiting_backend() {
    let runner = RecordingRunner::succeeding();
    let registry = ToolRegistry::new(Arc::new(runner.clone()), ToolSettings::default());
    let mut agent = Agent::new(Box::new(HangingProvider), registry, "sys");
    let mut prompt = ScriptedPrompt::new(&["hello"]);

    let reason = agent
        .run_until(&mut prompt, tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(agent.state(), AgentState::Stopped);
    assert!(prompt.rendered.is_empty());
    assert!(!prompt.busy);
    assert_eq!(prompt.busy_count, 1);
    // The user message went in before the request was abandoned.
    let history = agent.conversation().messages();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], Message::user("hello"));
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_ctrl_c_inside_input_interrupts() {
    let provider = MockProvider::new(vec![Message::assistant("Hi!")]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt {
        interrupt_when_done: true,
        ..ScriptedPrompt::new(&["hello"])
    };

    let reason = agent.run(&mut prompt).await.unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(agent.state(), AgentState::Stopped);
    assert_eq!(prompt.rendered, vec!["Hi!"]);
}

#[tokio::test]
async fn test_input_closed_stops_cleanly() {
    let provider = MockProvider::new(vec![]);
    let runner = RecordingRunner::succeeding();
    let mut agent = agent(&provider, &runner);
    let mut prompt = ScriptedPrompt::new(&[]);

    let reason = agent.run(&mut prompt).await.unwrap();
    assert_eq!(reason, StopReason::InputClosed);
}

#[tokio::test]
async fn test_history_invariant_holds_across_turns() {
    let provider = MockProvider::new(vec![
        Message::assistant("Hello."),
        tool_calls(vec![
            ToolCall::new("call_a", "recall_fact", r#"{"key": "nothing"}"#),
            ToolCall::new("call_b", "launch_app", r#"{"app_name": "maps", "query": "cafe"}"#),
        ]),
        Message::assistant("Opened maps."),
        tool_calls(vec![ToolCall::new("call_c", "unknown", "")]),
        Message::assistant("Sorry."),
    ]);
    let runner = RecordingRunner::succeeding();
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::new(
        Arc::new(runner.clone()),
        ToolSettings {
            memory_file: dir.path().join("memory.json"),
            ..ToolSettings::default()
        },
    );
    let mut agent = Agent::new(Box::new(provider.clone()), registry, "sys");
    let mut prompt = ScriptedPrompt::new(&["hi", "find a cafe", "do magic", "exit"]);

    agent.run(&mut prompt).await.unwrap();

    let history = agent.conversation().messages();
    conversation::verify(history).unwrap();
    assert_eq!(history.iter().filter(|m| m.role == Role::System).count(), 1);
    assert_eq!(history.iter().filter(|m| m.role == Role::User).count(), 3);
    assert_eq!(history.iter().filter(|m| m.role == Role::Tool).count(), 3);
    assert_eq!(
        prompt.rendered,
        vec!["Hello.", "Opened maps.", "Sorry."]
    );
    assert_eq!(provider.requests().len(), 5);
}
