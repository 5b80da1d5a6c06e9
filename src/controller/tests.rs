use std::sync::Mutex;
use std::time::Duration;

use super::*;
use crate::transcript::{Content, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Summarize(String),
    Generate { question: String, history: String },
}

/// Backend that echoes questions, optionally slowly or with failures.
#[derive(Debug, Default)]
struct StubBackend {
    calls: Mutex<Vec<Call>>,
    /// Questions answered after a delay.
    slow: Vec<(String, Duration)>,
    /// Questions that fail.
    failing: Vec<String>,
}

impl StubBackend {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatBackend for StubBackend {
    async fn generate_response(&self, question: &str, chat_history: &str) -> Result<String> {
        self.calls.lock().unwrap().push(Call::Generate {
            question: question.to_string(),
            history: chat_history.to_string(),
        });
        if let Some((_, delay)) = self.slow.iter().find(|(q, _)| q == question) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.iter().any(|q| q == question) {
            return Err(ChatError::Api {
                status: 500,
                message: "boom".into(),
            });
        }
        Ok(match question {
            "Hello" => "Hi there".to_string(),
            other => format!("re: {other}"),
        })
    }

    async fn summarize(&self, chat_history: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Summarize(chat_history.to_string()));
        Ok(format!("summary of {} chars", chat_history.len()))
    }
}

fn plain() -> ChatOptions {
    ChatOptions {
        summarize: false,
        bot_content: BotContentMode::Plain,
        backend_timeout: None,
    }
}

#[test]
fn test_send_triggers() {
    assert!(InputEvent::Click.is_send_trigger());
    assert!(InputEvent::KeyDown { key: "Enter".into() }.is_send_trigger());
    assert!(!InputEvent::KeyDown { key: "a".into() }.is_send_trigger());
    assert!(!InputEvent::KeyDown { key: "Shift".into() }.is_send_trigger());
}

#[tokio::test]
async fn test_hello_scenario() {
    let backend = Arc::new(StubBackend::default());
    let controller = ChatController::new(backend.clone(), plain());

    let reply = controller.send("Hello").await.unwrap().unwrap();
    assert_eq!(reply.index, 1);
    assert_eq!(reply.message.content, Content::PlainText("Hi there".into()));

    let transcript = controller.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.display_text(), "You: Hello\nBot: Hi there");
    assert_eq!(
        backend.calls(),
        vec![Call::Generate {
            question: "Hello".into(),
            history: "You: Hello".into(),
        }]
    );
}

#[tokio::test]
async fn test_user_entry_appended_before_reply() {
    let backend = Arc::new(StubBackend {
        slow: vec![("Hello".into(), Duration::from_millis(50))],
        ..Default::default()
    });
    let controller = ChatController::new(backend, plain());

    let mut turn = controller.submit("  Hello  ").unwrap().unwrap();
    assert_eq!(turn.question, "Hello");

    let echo = turn.echoed().await.unwrap();
    assert_eq!(echo.index, 0);
    assert_eq!(echo.message.content.raw(), "Hello");
    assert_eq!(controller.transcript().len(), 1);
    assert_eq!(controller.transcript().get(0).unwrap().sender, Sender::You);

    let reply = turn.reply().await.unwrap();
    assert_eq!(reply.message.sender, Sender::Bot);
    assert_eq!(controller.transcript().len(), 2);
}

#[tokio::test]
async fn test_blank_input_is_noop() {
    let backend = Arc::new(StubBackend::default());
    let controller = ChatController::new(backend.clone(), plain());

    for raw in ["", "   ", "\n\t"] {
        assert!(controller.send(raw).await.unwrap().is_none());
    }
    assert!(controller.transcript().is_empty());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_handle_event_clears_only_on_send() {
    let controller = ChatController::new(Arc::new(StubBackend::default()), plain());

    let mut input = "Hello".to_string();
    let ignored = controller
        .handle_event(&InputEvent::KeyDown { key: "x".into() }, &mut input)
        .unwrap();
    assert!(ignored.is_none());
    assert_eq!(input, "Hello");

    let mut blank = "   ".to_string();
    let none = controller.handle_event(&InputEvent::Click, &mut blank).unwrap();
    assert!(none.is_none());
    assert_eq!(blank, "   ");

    let turn = controller
        .handle_event(&InputEvent::KeyDown { key: "Enter".into() }, &mut input)
        .unwrap()
        .unwrap();
    assert!(input.is_empty());
    turn.reply().await.unwrap();
}

#[tokio::test]
async fn test_summary_runs_first_on_display_text() {
    let backend = Arc::new(StubBackend::default());
    let options = ChatOptions {
        summarize: true,
        ..plain()
    };
    let controller = ChatController::new(backend.clone(), options);

    controller.send("Hello").await.unwrap();
    controller.send("Tell me about kilims").await.unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], Call::Summarize("You: Hello".into()));
    assert_eq!(
        calls[1],
        Call::Generate {
            question: "Hello".into(),
            history: "summary of 10 chars".into(),
        }
    );
    let second_history = "You: Hello\nBot: Hi there\nYou: Tell me about kilims";
    assert_eq!(calls[2], Call::Summarize(second_history.into()));
    assert!(matches!(&calls[3], Call::Generate { question, .. } if question == "Tell me about kilims"));
}

#[tokio::test]
async fn test_rapid_sends_are_serialized() {
    let backend = Arc::new(StubBackend {
        slow: vec![("first".into(), Duration::from_millis(80))],
        ..Default::default()
    });
    let controller = ChatController::new(backend.clone(), plain());

    let mut first = controller.submit("first").unwrap().unwrap();
    let mut second = controller.submit("second").unwrap().unwrap();

    assert_eq!(first.echoed().await.unwrap().index, 0);
    // The queued turn's user entry follows the previous bot reply.
    assert_eq!(second.echoed().await.unwrap().index, 2);

    let (a, b) = futures::future::join(second.reply(), first.reply()).await;
    let (second_reply, first_reply) = (a.unwrap(), b.unwrap());
    assert_eq!(first_reply.index, 1);
    assert_eq!(second_reply.index, 3);

    let lines: Vec<String> = controller
        .transcript()
        .messages()
        .iter()
        .map(Message::display_line)
        .collect();
    assert_eq!(
        lines,
        vec!["You: first", "Bot: re: first", "You: second", "Bot: re: second"]
    );

    // The second call only started after the first one finished.
    assert_eq!(
        backend.calls(),
        vec![
            Call::Generate {
                question: "first".into(),
                history: "You: first".into(),
            },
            Call::Generate {
                question: "second".into(),
                history: "You: first\nBot: re: first\nYou: second".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_failed_turn_appends_no_bot_entry() {
    let backend = Arc::new(StubBackend {
        failing: vec!["broken".into()],
        ..Default::default()
    });
    let controller = ChatController::new(backend, plain());

    let err = controller.send("broken").await.unwrap_err();
    assert!(matches!(err, ChatError::Api { status: 500, .. }));
    assert_eq!(controller.transcript().len(), 1);

    // The queue keeps serving later turns.
    let reply = controller.send("Hello").await.unwrap().unwrap();
    assert_eq!(reply.index, 2);
}

#[tokio::test(start_paused = true)]
async fn test_backend_timeout() {
    let backend = Arc::new(StubBackend {
        slow: vec![("slow".into(), Duration::from_secs(60))],
        ..Default::default()
    });
    let options = ChatOptions {
        backend_timeout: Some(Duration::from_secs(5)),
        ..plain()
    };
    let controller = ChatController::new(backend, options);

    let err = controller.send("slow").await.unwrap_err();
    assert!(matches!(err, ChatError::Timeout(d) if d == Duration::from_secs(5)));
    assert_eq!(controller.transcript().len(), 1);
}

#[tokio::test]
async fn test_markup_mode_tags_reply() {
    let options = ChatOptions {
        bot_content: BotContentMode::Markup,
        ..plain()
    };
    let controller = ChatController::new(Arc::new(StubBackend::default()), options);

    let reply = controller.send("Hello").await.unwrap().unwrap();
    assert!(reply.message.content.is_markup());
}
