//! Subscription Replay Property Tests
//!
//! Checks the replay rules of the subscription manager over arbitrary
//! registration sequences and reconnect cycles.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use proptest::prelude::*;

use openfeed_client::domain::envelope::{ResultCode, Status, SubscriptionResponse};
use openfeed_client::{
    SubscriptionManager, SubscriptionRequest, SubscriptionState, SubscriptionType,
};

const SYMBOLS: [&str; 5] = ["AAPL", "MSFT", "ESZ5", "GOOG", "SPY"];
const TYPES: [SubscriptionType; 3] = [
    SubscriptionType::Quote,
    SubscriptionType::Trades,
    SubscriptionType::Ohlc,
];

fn request(symbol: usize, kind: usize) -> SubscriptionRequest {
    SubscriptionRequest::symbol(SYMBOLS[symbol], [TYPES[kind]])
}

fn response(id: u64, result: ResultCode) -> SubscriptionResponse {
    SubscriptionResponse {
        correlation_id: i64::try_from(id).unwrap(),
        status: Some(Status::new(result, "")),
        unsubscribe: false,
        target: None,
    }
}

fn requests() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..SYMBOLS.len(), 0..TYPES.len()), 1..20)
}

proptest! {
    #[test]
    fn every_entry_is_replayed_once_per_login(
        registrations in requests(),
        cycles in prop::collection::vec(prop::collection::vec(any::<Option<bool>>(), 20), 1..6),
    ) {
        let manager = SubscriptionManager::new();
        for (symbol, kind) in &registrations {
            manager.subscribe(request(*symbol, *kind));
        }
        let all: Vec<u64> = manager.snapshot().iter().map(|entry| entry.id).collect();

        for responses in cycles {
            let replay: Vec<u64> = manager.resubscribe_all(0).iter().map(|s| s.id).collect();
            prop_assert_eq!(&replay, &all);
            prop_assert!(manager.take_undispatched(0).is_empty());

            let mut acked = 0;
            for (id, outcome) in all.iter().zip(responses) {
                let result = match outcome {
                    Some(true) => ResultCode::Success,
                    Some(false) => ResultCode::SystemError,
                    None => continue,
                };
                let (matched, state) =
                    manager.on_subscription_response(&response(*id, result)).unwrap();
                prop_assert_eq!(matched, *id);
                if state == SubscriptionState::Acked {
                    acked += 1;
                }
            }
            prop_assert_eq!(manager.stats().acked, acked);

            manager.rearm(0);
            prop_assert_eq!(manager.stats().pending, all.len());
        }
    }

    #[test]
    fn identical_requests_are_never_queued_twice(registrations in requests()) {
        let manager = SubscriptionManager::new();
        let mut seen = BTreeSet::new();

        for (symbol, kind) in &registrations {
            let registration = manager.subscribe(request(*symbol, *kind));
            prop_assert_eq!(registration.queued, seen.insert((*symbol, *kind)));

            if registration.queued {
                let sent = manager.take_undispatched(0);
                prop_assert_eq!(sent.len(), 1);
                prop_assert_eq!(sent[0].id, registration.id);
            } else {
                prop_assert!(manager.take_undispatched(0).is_empty());
            }
        }
        prop_assert_eq!(manager.len(), seen.len());
    }

    #[test]
    fn shared_entries_are_claimed_by_one_connection(
        registrations in requests(),
        split in 0..20_usize,
    ) {
        let manager = SubscriptionManager::new();
        for (index, (symbol, kind)) in registrations.iter().enumerate() {
            manager.subscribe(request(*symbol, *kind));
            if index == split {
                manager.resubscribe_all(0);
            }
        }

        let first: BTreeSet<u64> = manager.take_undispatched(0).iter().map(|s| s.id).collect();
        let second: BTreeSet<u64> = manager.resubscribe_all(1).iter().map(|s| s.id).collect();
        prop_assert!(first.is_disjoint(&second));

        manager.rearm(0);
        let taken_over: BTreeSet<u64> = manager.resubscribe_all(1).iter().map(|s| s.id).collect();
        let all: BTreeSet<u64> = manager.snapshot().iter().map(|entry| entry.id).collect();
        prop_assert_eq!(taken_over, all);
    }
}
