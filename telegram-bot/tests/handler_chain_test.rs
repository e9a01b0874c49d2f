//! Integration tests for [`telegram_bot::HandlerChain`].
//!
//! Covers: before/handle/after order across handlers, a before returning false, Reply ending
//! the handle phase and reaching every after, and errors propagating.

mod mock_bot;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use telegram_bot::{DbotError, Handler, HandlerChain, HandlerResponse, Message};

use mock_bot::private_message;

type Log = Arc<Mutex<Vec<String>>>;

/// Logs every phase as `"{name}.{phase}"` and answers `handle` with a fixed response.
struct Step {
    name: &'static str,
    log: Log,
    allow: bool,
    response: HandlerResponse,
}

impl Step {
    fn new(name: &'static str, log: &Log, response: HandlerResponse) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
            allow: true,
            response,
        })
    }

    fn blocking(name: &'static str, log: &Log) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
            allow: false,
            response: HandlerResponse::Continue,
        })
    }

    fn push(&self, phase: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.{}", self.name, phase));
    }
}

#[async_trait]
impl Handler for Step {
    async fn before(&self, _message: &Message) -> telegram_bot::Result<bool> {
        self.push("before");
        Ok(self.allow)
    }

    async fn handle(&self, _message: &Message) -> telegram_bot::Result<HandlerResponse> {
        self.push("handle");
        Ok(self.response.clone())
    }

    async fn after(
        &self,
        _message: &Message,
        response: &HandlerResponse,
    ) -> telegram_bot::Result<()> {
        self.push(&format!("after({:?})", response));
        Ok(())
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// **Test: All befores run in order, then handles until Reply, then afters in reverse.**
#[tokio::test]
async fn phases_run_in_order() {
    let log: Log = Arc::default();
    let chain = HandlerChain::new()
        .add_handler(Step::new("a", &log, HandlerResponse::Continue))
        .add_handler(Step::new("b", &log, HandlerResponse::Reply("hi".into())))
        .add_handler(Step::new("c", &log, HandlerResponse::Continue));

    let response = chain.handle(&private_message(1, "text")).await.unwrap();

    assert_eq!(response, HandlerResponse::Reply("hi".into()));
    assert_eq!(
        entries(&log),
        vec![
            "a.before",
            "b.before",
            "c.before",
            "a.handle",
            "b.handle",
            "c.after(Reply(\"hi\"))",
            "b.after(Reply(\"hi\"))",
            "a.after(Reply(\"hi\"))",
        ]
    );
}

/// **Test: A before returning false stops everything, including afters.**
#[tokio::test]
async fn before_false_stops_chain() {
    let log: Log = Arc::default();
    let chain = HandlerChain::new()
        .add_handler(Step::blocking("gate", &log))
        .add_handler(Step::new("work", &log, HandlerResponse::Continue));

    let response = chain.handle(&private_message(1, "text")).await.unwrap();

    assert_eq!(response, HandlerResponse::Stop);
    assert_eq!(entries(&log), vec!["gate.before"]);
}

/// **Test: Continue does not end the handle phase and is the result when nobody replies.**
#[tokio::test]
async fn continue_passes_to_next_handler() {
    let log: Log = Arc::default();
    let chain = HandlerChain::new()
        .add_handler(Step::new("a", &log, HandlerResponse::Continue))
        .add_handler(Step::new("b", &log, HandlerResponse::Continue));

    let response = chain.handle(&private_message(1, "text")).await.unwrap();

    assert_eq!(response, HandlerResponse::Continue);
    assert!(entries(&log).contains(&"b.handle".to_string()));
}

/// **Test: A handler error is returned from the chain.**
#[tokio::test]
async fn handler_error_propagates() {
    struct Failing;

    #[async_trait]
    impl Handler for Failing {
        async fn handle(&self, _message: &Message) -> telegram_bot::Result<HandlerResponse> {
            Err(DbotError::Bot("boom".into()))
        }
    }

    let chain = HandlerChain::new().add_handler(Arc::new(Failing));

    let result = chain.handle(&private_message(1, "text")).await;

    assert!(matches!(result, Err(DbotError::Bot(ref m)) if m == "boom"));
}

#[test]
fn empty_chain_reports_empty() {
    let chain = HandlerChain::new();
    assert!(chain.is_empty());
    assert_eq!(chain.len(), 0);
}
