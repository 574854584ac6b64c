//! Property tests for queue ordering.

use proptest::prelude::*;
use rotor_core::{Event, EventId, EventKind, EventPayload, SimTime};
use rotor_sched::{EventQueue, Scheduler};

fn event(time: u64, seq: u64) -> Event {
    Event {
        id: EventId(seq),
        time: SimTime(time),
        priority: (seq % 7) as u32 * 20,
        seq,
        kind: EventKind::Custom(0),
        payload: EventPayload::None,
    }
}

fn drain(q: &mut EventQueue) -> Vec<(u64, u64)> {
    std::iter::from_fn(|| q.poll())
        .map(|e| (e.time.0, e.seq))
        .collect()
}

proptest! {
    #[test]
    fn poll_yields_nondecreasing_times_fifo_on_ties(times in prop::collection::vec(0u64..50, 0..200)) {
        let mut q = EventQueue::new();
        for (seq, t) in times.iter().enumerate() {
            q.offer(event(*t, seq as u64));
        }
        let out = drain(&mut q);
        prop_assert_eq!(out.len(), times.len());
        for pair in out.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(a.0 <= b.0);
            if a.0 == b.0 {
                prop_assert!(a.1 < b.1);
            }
        }
    }

    #[test]
    fn offer_all_matches_sequential_offer(times in prop::collection::vec(0u64..20, 0..100)) {
        let events: Vec<Event> = times
            .iter()
            .enumerate()
            .map(|(seq, t)| event(*t, seq as u64))
            .collect();

        let mut one_by_one = EventQueue::new();
        for e in events.clone() {
            one_by_one.offer(e);
        }
        let mut bulk = EventQueue::new();
        bulk.offer_all(events);

        prop_assert_eq!(drain(&mut one_by_one), drain(&mut bulk));
    }

    #[test]
    fn take_all_is_globally_sorted(times in prop::collection::vec(0u64..1000, 0..200)) {
        let mut q = EventQueue::new();
        q.offer_all(times.iter().enumerate().map(|(seq, t)| event(*t, seq as u64)));
        let all: Vec<_> = q.take_all().into_iter().map(|e| (e.time.0, e.seq)).collect();

        let mut expected = all.clone();
        expected.sort();
        prop_assert_eq!(all, expected);
        prop_assert!(q.is_empty());
    }

    #[test]
    fn cancel_preserves_survivor_order(
        times in prop::collection::vec(0u64..10, 1..60),
        stride in 2usize..5,
    ) {
        let mut s = Scheduler::new();
        let ids: Vec<_> = times
            .iter()
            .map(|t| s.schedule(SimTime(*t), EventKind::Custom(0), EventPayload::None).unwrap())
            .collect();
        for id in ids.iter().step_by(stride) {
            s.cancel(*id);
        }
        let out: Vec<_> = s.take_all().into_iter().map(|e| (e.time.0, e.seq)).collect();
        let mut expected = out.clone();
        expected.sort();
        prop_assert_eq!(out, expected);
    }
}
