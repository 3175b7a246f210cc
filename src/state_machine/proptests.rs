//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::message::Sender;
use crate::reply::{GenerationError, Reply};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("test-session")
}

/// Simplified model of the log: senders in order
fn apply_appends(log: &mut Vec<Sender>, effects: &[Effect]) {
    for effect in effects {
        if let Effect::AppendMessage { sender, .. } = effect {
            log.push(*sender);
        }
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_ticket() -> impl Strategy<Value = ReplyTicket> {
    (0u64..6).prop_map(ReplyTicket::new)
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Idle),
        arb_ticket().prop_map(|ticket| SessionState::AwaitingReply { ticket }),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ]{1,30}".prop_map(String::from),
        Just(String::new()),
        " {1,5}".prop_map(String::from),
    ]
}

fn arb_reply() -> impl Strategy<Value = Reply> {
    ("[a-zA-Z ]{0,30}", any::<bool>()).prop_map(|(content, flagged)| Reply { content, flagged })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (arb_text(), arb_ticket())
            .prop_map(|(text, ticket)| Event::PatientMessage { text, ticket }),
        (arb_ticket(), arb_reply()).prop_map(|(ticket, reply)| Event::ReplyReady { ticket, reply }),
        (arb_ticket(), "[a-z ]{1,20}").prop_map(|(ticket, message)| Event::ReplyFailed {
            ticket,
            error: GenerationError::unavailable(message),
        }),
        Just(Event::Cancel),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: RequestReply only ever accompanies entering AwaitingReply
    #[test]
    fn prop_request_reply_matches_new_state(
        state in arb_state(),
        event in arb_event(),
    ) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            let requested: Vec<_> = result
                .effects
                .iter()
                .filter_map(|e| match e {
                    Effect::RequestReply { ticket } => Some(*ticket),
                    _ => None,
                })
                .collect();
            prop_assert!(requested.len() <= 1, "More than one reply requested");
            if let Some(ticket) = requested.first() {
                prop_assert_eq!(state, SessionState::Idle);
                prop_assert_eq!(result.new_state, SessionState::AwaitingReply { ticket: *ticket });
            }
        }
    }

    // Invariant 2: Awaiting state rejects every patient message
    #[test]
    fn prop_busy_rejects_messages(
        ticket in arb_ticket(),
        text in arb_text(),
        new_ticket in arb_ticket(),
    ) {
        let state = SessionState::AwaitingReply { ticket };
        let result = transition(
            &state,
            &test_context(),
            Event::PatientMessage { text, ticket: new_ticket },
        );
        prop_assert!(matches!(
            result,
            Err(TransitionError::Busy | TransitionError::EmptyInput)
        ));
    }

    // Invariant 3: Replies for any ticket other than the pending one change nothing
    #[test]
    fn prop_stale_replies_are_noops(
        state in arb_state(),
        ticket in arb_ticket(),
        reply in arb_reply(),
    ) {
        prop_assume!(state.pending_ticket() != Some(ticket));
        let event = Event::ReplyReady { ticket, reply };
        let result = transition(&state, &test_context(), event).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert!(result.effects.is_empty());
    }

    // Invariant 4: Round trips add exactly a patient/assistant pair
    #[test]
    fn prop_round_trips_alternate(
        texts in proptest::collection::vec("[a-zA-Z]{1,10}( [a-zA-Z]{1,10}){0,3}", 1..10),
    ) {
        let ctx = test_context();
        let mut state = SessionState::Idle;
        let mut log = Vec::new();
        let mut ticket = ReplyTicket::new(0);

        for text in texts {
            ticket = ticket.next();
            let sent = transition(&state, &ctx, Event::PatientMessage { text, ticket }).unwrap();
            apply_appends(&mut log, &sent.effects);
            state = sent.new_state;

            let replied = transition(
                &state,
                &ctx,
                Event::ReplyReady { ticket, reply: Reply::text("noted") },
            )
            .unwrap();
            apply_appends(&mut log, &replied.effects);
            state = replied.new_state;
            prop_assert_eq!(state, SessionState::Idle);
        }

        prop_assert_eq!(log.len() % 2, 0);
        for pair in log.chunks(2) {
            prop_assert_eq!(pair, &[Sender::Patient, Sender::Assistant][..]);
        }
    }

    // Invariant 5: Cancel always lands in Idle
    #[test]
    fn prop_cancel_reaches_idle(state in arb_state()) {
        let result = transition(&state, &test_context(), Event::Cancel).unwrap();
        prop_assert_eq!(result.new_state, SessionState::Idle);
    }

    // Invariant 6: Rejected events never produce a different state
    #[test]
    fn prop_random_sequences_stay_consistent(
        events in proptest::collection::vec(arb_event(), 0..30),
    ) {
        let ctx = test_context();
        let mut state = SessionState::Idle;

        for event in events {
            let was_idle = state == SessionState::Idle;
            let is_message = matches!(event, Event::PatientMessage { .. });
            match transition(&state, &ctx, event) {
                Ok(result) => {
                    if is_message {
                        prop_assert!(was_idle, "Message accepted while busy");
                    }
                    let appended = result
                        .effects
                        .iter()
                        .filter(|e| matches!(e, Effect::AppendMessage { .. }))
                        .count();
                    prop_assert!(appended <= 1);
                    state = result.new_state;
                }
                Err(_) => prop_assert!(is_message, "Only patient messages can be rejected"),
            }
        }
    }
}
