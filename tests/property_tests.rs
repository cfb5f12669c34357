//! Property-based tests for the table engine and the request protocol.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

mod common;

use chrono::Utc;
use common::{Harness, CLIENT_KEY, SECOND};
use proptest::prelude::*;
use std::convert::Infallible;
use std::sync::Arc;
use switchyard::builder::{always, StateTableBuilder};
use switchyard::core::{Entry, Label, State, StateHistory, StateMachine, StateTable, StateTransition};
use switchyard::request::{
    RequestState, ResultCode, Response, RetrySetting, TimerEvent, TimerKind,
};

#[derive(Debug, Default)]
struct RoundTrip {
    counter: i32,
    initial_entries: Vec<Entry>,
}

/// States {1, 5, 10}, transitions {1, 10}.
fn round_trip_table() -> Arc<StateTable<RoundTrip, Infallible>> {
    let mut builder = StateTableBuilder::new("round-trip");
    builder
        .register_state(State::new(1).on_enter(|ctx: &mut RoundTrip, entry| {
            if entry.is_initial() {
                ctx.initial_entries.push(entry);
            }
            Ok(None)
        }))
        .unwrap();
    builder
        .register_state(State::new(5).on_enter(|ctx: &mut RoundTrip, _| {
            ctx.counter += 1;
            Ok(None)
        }))
        .unwrap();
    builder
        .register_state(State::new(10).on_enter(|ctx: &mut RoundTrip, _| {
            ctx.counter -= 1;
            Ok(None)
        }))
        .unwrap();

    builder.link_states(1, 1, 5).unwrap();
    builder.link_states(1, 10, 10).unwrap();
    builder.link_states(5, 1, 10).unwrap();
    builder.link_states(10, 1, 1).unwrap();

    builder.register_event_translator(1, 5, always(1)).unwrap();
    builder.register_event_translator(1, 10, always(10)).unwrap();
    builder.register_event_translator(5, 5, always(1)).unwrap();
    builder.register_event_translator(10, 5, always(1)).unwrap();

    Arc::new(builder.build().unwrap())
}

#[test]
fn round_trip_through_sparse_ids() {
    let mut machine = StateMachine::new("round-trip", round_trip_table(), RoundTrip::default());
    machine.start(1).unwrap();
    assert_eq!(machine.context().initial_entries, vec![Entry::INITIAL]);

    let mut states = Vec::new();
    let mut counters = Vec::new();
    for event in [7, 5, 10, 5, 5, 10] {
        machine.on_event_received(event).unwrap();
        states.push(machine.current_state().unwrap());
        counters.push(machine.context().counter);
    }

    assert_eq!(states, vec![1, 5, 5, 10, 1, 10]);
    assert_eq!(counters, vec![0, 1, 1, 0, 0, -1]);
    assert_eq!(machine.context().initial_entries.len(), 1);
}

#[derive(Debug, Default)]
struct Ring {
    entries: usize,
}

/// `n` states in a ring: event 0 steps forward, event 1 maps to an unlinked
/// transition, other events have no translator.
fn ring_table(n: u16) -> Arc<StateTable<Ring, Infallible>> {
    let mut builder = StateTableBuilder::new("ring");
    for id in 0..n {
        builder
            .register_state(State::new(id).on_enter(|ring: &mut Ring, _| {
                ring.entries += 1;
                Ok(None)
            }))
            .unwrap();
    }
    let all: Vec<u16> = (0..n).collect();
    for id in 0..n {
        builder.link_states(id, 0, (id + 1) % n).unwrap();
    }
    builder.register_event_translator_for(&all, 0, always(0)).unwrap();
    builder.register_event_translator_for(&all, 1, always(3)).unwrap();
    Arc::new(builder.build().unwrap())
}

prop_compose! {
    fn ring_and_start()(n in 1u16..8)(n in Just(n), start in 0..n) -> (u16, u16) {
        (n, start)
    }
}

proptest! {
    #[test]
    fn start_enters_exactly_once((n, start) in ring_and_start()) {
        let mut machine = StateMachine::new("ring", ring_table(n), Ring::default());
        machine.start(start).unwrap();

        prop_assert_eq!(machine.current_state(), Some(start));
        prop_assert_eq!(machine.context().entries, 1);
    }

    #[test]
    fn only_translated_and_linked_events_move(
        (n, start) in ring_and_start(),
        events in prop::collection::vec(0u16..6, 0..40),
    ) {
        let mut machine = StateMachine::new("ring", ring_table(n), Ring::default());
        machine.start(start).unwrap();

        for &event in &events {
            machine.on_event_received(event).unwrap();
        }

        let steps = events.iter().filter(|&&e| e == 0).count();
        let expected = (start as usize + steps) % n as usize;
        prop_assert_eq!(machine.current_state(), Some(expected as u16));
        prop_assert_eq!(machine.context().entries, 1 + steps);
    }

    #[test]
    fn events_before_start_do_nothing(events in prop::collection::vec(0u16..6, 0..20)) {
        let mut machine = StateMachine::new("ring", ring_table(3), Ring::default());
        for event in events {
            machine.on_event_received(event).unwrap();
        }
        prop_assert_eq!(machine.current_state(), None);
        prop_assert_eq!(machine.context().entries, 0);
    }

    #[test]
    fn history_preserves_order(
        path in prop::collection::vec(0u16..10, 1..20),
        capacity in 1usize..30,
    ) {
        let mut history = StateHistory::with_capacity(capacity);
        let mut previous = None;
        for &to in &path {
            history.record(StateTransition {
                from: previous,
                to,
                transition: previous.map(|_| 0),
                timestamp: Utc::now(),
            });
            previous = Some(to);
        }

        let kept = path.len().min(capacity);
        let recorded: Vec<u16> = history.transitions().map(|t| t.to).collect();
        prop_assert_eq!(recorded, path[path.len() - kept..].to_vec());
    }

    #[test]
    fn done_request_absorbs_everything(kinds in prop::collection::vec(0u8..6, 1..20)) {
        let mut harness = Harness::new(RetrySetting::new(5 * SECOND, SECOND, 3));
        harness.request.start().unwrap();
        harness.request.on_response(Response::ok(CLIENT_KEY)).unwrap();
        prop_assert_eq!(harness.request.state(), Some(RequestState::Done));
        let outcome = harness.request.result().outcome();
        let sent = harness.sender.sent();

        for kind in kinds {
            match kind {
                0 => harness.request.start().unwrap(),
                1 => harness.request.on_response(Response::ok(CLIENT_KEY)).unwrap(),
                2 => harness.request.on_response(Response::pending(CLIENT_KEY)).unwrap(),
                3 => harness
                    .request
                    .on_response(Response::failed(CLIENT_KEY, ResultCode::Rejected))
                    .unwrap(),
                4 => harness
                    .request
                    .on_timer(TimerEvent { client_key: CLIENT_KEY, kind: TimerKind::RequestTimeout })
                    .unwrap(),
                _ => harness
                    .request
                    .on_timer(TimerEvent { client_key: CLIENT_KEY, kind: TimerKind::RetryDelay })
                    .unwrap(),
            }
        }

        prop_assert_eq!(harness.request.state(), Some(RequestState::Done));
        prop_assert!(harness.request.state().is_some_and(Label::is_final));
        prop_assert_eq!(harness.request.result().outcome(), outcome);
        prop_assert_eq!(harness.sender.sent(), sent);
        prop_assert!(harness.timers.pending().is_empty());
    }
}
