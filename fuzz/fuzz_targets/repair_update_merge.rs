//! Fuzz harness for repair update decoding and the forward-only merge.
//!
//! Arbitrary bytes are decoded as a sequence of `RepairUpdate` JSON bodies
//! (one per line) and folded into an empty tracker. Decoding must never
//! panic, and no milestone may change once it has been recorded.

#![no_main]
use roadwatch_core::HazardId;
use roadwatch_core::repair::{Milestone, RepairTracker, RepairUpdate, merge};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut tracker = RepairTracker::new(HazardId::from("fuzz"));
    for line in text.lines() {
        let Ok(update) = serde_json::from_str::<RepairUpdate>(line) else {
            continue;
        };

        let next = merge(&tracker, &update);
        for milestone in Milestone::ALL {
            if let Some(before) = tracker.milestone(milestone) {
                assert_eq!(next.milestone(milestone), Some(before));
            }
        }
        assert_eq!(merge(&next, &update), next);
        tracker = next;
    }
});
