//! Drives a handful of requests against a simulated exchange on virtual time.
//!
//! Run with `cargo run --example request_loop`. Set `RUST_LOG=debug` to see
//! every timer and state change.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::rc::Rc;
use switchyard::config::AppConfig;
use switchyard::lifecycle::{LifecycleEvent, LifecycleMachine, ServiceHooks, TracingStatusSink};
use switchyard::logging::init_logging;
use switchyard::request::{
    Destination, ManualTimerService, Request, RequestContext, RequestExecution, RequestSender,
    RequestStateMachine, Response, ResultCode, SendError,
};

const CONFIG: &str = r#"{
    "log_level": "info",
    "services": [{ "name": "order-gateway", "warmup": false }],
    "requests": {
        "new_order": {
            "timeout_ns": 2000000000,
            "init_delay_ns": 250000000,
            "max_retry_attempts": 2,
            "growth": "exponential"
        }
    }
}"#;

const TICK_NS: u64 = 100_000_000;
const EXCHANGE: Destination = 1;

/// Loses the first copy of some requests and rejects others.
#[derive(Default)]
struct Exchange {
    outbox: RefCell<Vec<u64>>,
    lose_once: RefCell<HashSet<u64>>,
    reject: HashSet<u64>,
}

impl Exchange {
    fn replies(&self) -> Vec<Response> {
        self.outbox
            .borrow_mut()
            .drain(..)
            .map(|key| {
                if self.reject.contains(&key) {
                    Response::failed(key, ResultCode::Rejected)
                } else {
                    Response::ok(key).with_payload(serde_json::json!({ "order_id": key * 100 }))
                }
            })
            .collect()
    }
}

impl RequestSender for Exchange {
    fn send_request(&self, _destination: Destination, request: &Request) -> Result<(), SendError> {
        if self.lose_once.borrow_mut().remove(&request.client_key) {
            tracing::info!(client_key = request.client_key, "exchange lost the request");
            return Ok(());
        }
        self.outbox.borrow_mut().push(request.client_key);
        Ok(())
    }
}

struct Gateway;

impl ServiceHooks for Gateway {}

fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_json_str(CONFIG)?;
    init_logging(&config.log_level);

    let service_config = config
        .service("order-gateway")
        .ok_or("order-gateway is not configured")?;
    let mut gateway = LifecycleMachine::new(
        LifecycleMachine::<Gateway>::table()?,
        service_config.name.clone(),
        Gateway,
        Rc::new(TracingStatusSink),
        service_config.warmup,
    )?;
    gateway.on_thread_start()?;
    gateway.send(LifecycleEvent::Activate)?;
    println!("{} is {:?}", gateway.name(), gateway.state());

    let setting = config
        .retry_setting("new_order")
        .cloned()
        .ok_or("new_order has no retry setting")?;
    let exchange = Rc::new(Exchange {
        lose_once: RefCell::new(HashSet::from([2, 3])),
        reject: HashSet::from([4]),
        ..Exchange::default()
    });
    let timers = Rc::new(ManualTimerService::new());
    let execution = Rc::new(RequestExecution::new(
        setting,
        exchange.clone(),
        timers.clone(),
    ));

    let table = RequestStateMachine::table()?;
    let mut requests = BTreeMap::new();
    for key in 1..=4u64 {
        let context = RequestContext::new(execution.clone(), EXCHANGE, Request::new(key, "new_order"));
        let mut request = RequestStateMachine::new(table.clone(), context);
        request.start()?;
        requests.insert(key, request);
    }

    // lose every copy of request 3 from now on
    exchange.lose_once.borrow_mut().insert(3);

    while requests.values().any(|request| !request.is_done()) {
        for response in exchange.replies() {
            if let Some(request) = requests.get_mut(&response.client_key) {
                request.on_response(response)?;
            }
        }
        for event in timers.advance(TICK_NS) {
            if let Some(request) = requests.get_mut(&event.client_key) {
                request.on_timer(event)?;
            }
            if event.client_key == 3 {
                exchange.lose_once.borrow_mut().insert(3);
            }
        }
    }

    for (key, request) in &requests {
        let context = request.context();
        match request.result().outcome() {
            Some(Ok(response)) => println!(
                "request {key}: filled after {} retries, payload {}",
                context.retry_count(),
                response.payload
            ),
            Some(Err(err)) => println!("request {key}: {err}"),
            None => println!("request {key}: still pending"),
        }
    }

    gateway.on_thread_stop()?;
    println!("{} is {:?}", gateway.name(), gateway.state());
    Ok(())
}
