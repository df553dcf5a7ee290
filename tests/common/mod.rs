#![allow(dead_code)]

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use gm_screen::editor::paragraphs_payload;
use gm_screen::{EditorError, EditorHost, RichTextEditor};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

pub fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(64)
}

/// Stays pending for `remaining` polls.
pub struct Yield {
    remaining: usize,
}

impl Yield {
    pub fn new(remaining: usize) -> Self {
        Self { remaining }
    }
}

impl Future for Yield {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.remaining == 0 {
            return Poll::Ready(());
        }
        self.remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Editor whose saves take a number of polls to complete. Saves of editors
/// whose first paragraph starts with `fail` are rejected.
pub struct SlowEditor {
    payload: Rc<RefCell<Value>>,
    delay: usize,
    completions: Rc<RefCell<Vec<String>>>,
}

impl SlowEditor {
    fn label(payload: &Value) -> String {
        payload
            .pointer("/blocks/0/data/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

impl RichTextEditor for SlowEditor {
    fn save(&self) -> LocalBoxFuture<'static, Result<Value, EditorError>> {
        let payload = self.payload.borrow().clone();
        let delay = self.delay;
        let completions = Rc::clone(&self.completions);
        async move {
            Yield::new(delay).await;
            let label = SlowEditor::label(&payload);
            completions.borrow_mut().push(label.clone());
            if label.starts_with("fail") {
                Err(EditorError::Rejected(label))
            } else {
                Ok(payload)
            }
        }
        .boxed_local()
    }

    fn render(&self, payload: &Value) -> Result<(), EditorError> {
        *self.payload.borrow_mut() = payload.clone();
        Ok(())
    }
}

/// Hands out [`SlowEditor`]s with the given delays, in creation order.
#[derive(Clone, Default)]
pub struct SlowHost {
    delays: Rc<RefCell<VecDeque<usize>>>,
    completions: Rc<RefCell<Vec<String>>>,
}

impl SlowHost {
    pub fn new(delays: impl IntoIterator<Item = usize>) -> Self {
        Self {
            delays: Rc::new(RefCell::new(delays.into_iter().collect())),
            completions: Rc::default(),
        }
    }

    /// Labels of completed saves, in completion order.
    pub fn completions(&self) -> Vec<String> {
        self.completions.borrow().clone()
    }
}

impl EditorHost for SlowHost {
    fn attach(&self, initial: Option<&Value>) -> Box<dyn RichTextEditor> {
        let delay = self.delays.borrow_mut().pop_front().unwrap_or(0);
        Box::new(SlowEditor {
            payload: Rc::new(RefCell::new(
                initial.cloned().unwrap_or_else(|| json!({ "blocks": [] })),
            )),
            delay,
            completions: Rc::clone(&self.completions),
        })
    }
}

pub fn block(left: &str, top: &str, children: Vec<Value>) -> Value {
    let mut node = json!({
        "type": "block",
        "width": "30em",
        "height": "30ex",
        "top": top,
        "left": left,
    });
    if !children.is_empty() {
        node["children"] = Value::Array(children);
    }
    node
}

pub fn header(text: &str) -> Value {
    json!({ "type": "blockHeader", "text": text })
}

pub fn content(kind: &str, paragraphs: &[&str]) -> Value {
    json!({ "type": kind, "data": paragraphs_payload(paragraphs.iter().copied()) })
}
