#![no_main]

use libfuzzer_sys::fuzz_target;
use trueframe_core::AggregationPolicy;

fuzz_target!(|data: &[u8]| {
    let Ok(policy) = serde_json::from_slice::<AggregationPolicy>(data) else {
        return;
    };
    // Validation decides, it never panics; a validated policy survives a
    // serialization round trip.
    if let Ok(valid) = policy.validated() {
        let json = serde_json::to_vec(&valid).expect("policy serializes");
        let back: AggregationPolicy = serde_json::from_slice(&json).expect("policy reparses");
        assert!(back.validated().is_ok());
    }
});
