//! Property-based tests for token reconciliation
//!
//! The upstream counter only grows; restores inject reset events at
//! arbitrary points. Deltas must stay non-negative and must add up to what
//! was actually spent between resets.

use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Event {
    /// A model call that spent this many prompt/completion tokens
    Call { prompt: u64, completion: u64 },
    /// A restore at the current counter value
    Reset,
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => (0u64..5_000, 0u64..2_000).prop_map(|(prompt, completion)| Event::Call { prompt, completion }),
        1 => Just(Event::Reset),
    ]
}

fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    proptest::collection::vec(arb_event(), 0..50)
}

/// Drive a ledger with a simulated never-reset counter
fn drive(events: &[Event]) -> (TokenLedger, Vec<TokenCounts>) {
    let mut ledger = TokenLedger::new();
    let mut counter = TokenCounts::default();
    let mut spent = Vec::new();
    for event in events {
        match *event {
            Event::Call { prompt, completion } => {
                let call = TokenCounts::new(prompt + completion, prompt, completion);
                counter = counter.saturating_add(call);
                ledger.record(counter);
                spent.push(call);
            }
            Event::Reset => ledger.record_reset(counter),
        }
    }
    (ledger, spent)
}

proptest! {
    #[test]
    fn prop_deltas_are_never_negative_and_match_spend(events in arb_events()) {
        let (ledger, spent) = drive(&events);
        let deltas: Vec<TokenCounts> = ledger
            .entries()
            .iter()
            .filter(|e| e.step != Step::Reset)
            .map(|e| e.delta)
            .collect();
        // With a monotone counter, every numbered delta is exactly that call's spend
        prop_assert_eq!(deltas, spent);
    }

    #[test]
    fn prop_steps_count_only_numbered_rows(events in arb_events()) {
        let (ledger, _) = drive(&events);
        let mut expected = 1u64;
        for entry in ledger.entries() {
            match entry.step {
                Step::Numbered(n) => {
                    prop_assert_eq!(n, expected);
                    expected += 1;
                }
                Step::Reset => {
                    prop_assert_eq!(entry.delta, TokenCounts::default());
                    prop_assert_eq!(entry.cumulative, TokenCounts::default());
                }
            }
        }
    }

    /// Arbitrary (even decreasing) counter readings never yield a value
    /// larger than the reading itself, and never underflow
    #[test]
    fn prop_arbitrary_readings_are_clamped(
        readings in proptest::collection::vec((0u64..1_000, 0u64..1_000, 0u64..1_000, any::<bool>()), 0..40)
    ) {
        let mut ledger = TokenLedger::new();
        for (total, prompt, completion, reset) in readings {
            let counts = TokenCounts::new(total, prompt, completion);
            if reset {
                ledger.record_reset(counts);
            } else {
                let entry = ledger.record(counts);
                prop_assert!(entry.delta.total <= total);
                prop_assert!(entry.delta.prompt <= prompt);
                prop_assert!(entry.delta.completion <= completion);
            }
        }
        prop_assert_eq!(ledger.series().steps.len(), ledger.entries().len());
    }

    #[test]
    fn prop_consumed_equals_total_spend(events in arb_events()) {
        let (ledger, spent) = drive(&events);
        let total = spent
            .iter()
            .fold(TokenCounts::default(), |acc, c| acc.saturating_add(*c));
        prop_assert_eq!(ledger.consumed(), total);
    }
}
