#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

use trueframe_core::attestation::{AttestationEvidence, KeyProtectionLevel};
use trueframe_core::signal::{
    ArtifactFindings, DepthFindings, DetectorFindings, RecaptureSurface,
};
use trueframe_core::{
    evaluate_collected, AggregationPolicy, DetectorResult, MethodId, ResultStatus,
};

#[derive(Debug, Arbitrary)]
struct RawResult {
    method: u8,
    kind: u8,
    flagged: bool,
    confidence: f32,
    secondary: f32,
    layers: u32,
    surface: u8,
}

#[derive(Debug, Arbitrary)]
struct Input {
    valid: bool,
    results: Vec<RawResult>,
}

fn method_of(raw: u8) -> MethodId {
    MethodId::ALL[(raw as usize) % MethodId::ALL.len()]
}

fn result_of(raw: &RawResult) -> DetectorResult {
    let method = method_of(raw.method);
    match raw.kind % 4 {
        0 => DetectorResult::unavailable(method),
        1 => DetectorResult::timeout(method),
        2 => DetectorResult::error(method),
        _ => {
            let findings = if method == MethodId::Depth {
                DetectorFindings::Depth(DepthFindings {
                    verdict_real: raw.flagged,
                    depth_variance: raw.secondary,
                    layer_count: raw.layers,
                })
            } else {
                DetectorFindings::Artifact(ArtifactFindings {
                    artifact_detected: raw.flagged,
                    artifact_confidence: raw.confidence,
                    clean_confidence: raw.secondary,
                    recapture_surface: match raw.surface % 3 {
                        0 => None,
                        1 => Some(RecaptureSurface::Screen),
                        _ => Some(RecaptureSurface::Print),
                    },
                })
            };
            DetectorResult::success(method, findings)
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(input) = Input::arbitrary(&mut u) else {
        return;
    };

    let results: Vec<DetectorResult> = input.results.iter().map(result_of).collect();
    let evidence = if input.valid {
        AttestationEvidence::verified("android", KeyProtectionLevel::StrongBox, 1)
    } else {
        AttestationEvidence::unverified("android")
    };
    let computed_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    let result = evaluate_collected(
        &evidence,
        &results,
        &AggregationPolicy::default(),
        0,
        computed_at,
    );

    // Evaluation is total and bounded for any input shape.
    assert!((0.0..=1.0).contains(&result.overall_confidence));
    assert_eq!(result.method_breakdown.len(), MethodId::ALL.len());
    if result.status == ResultStatus::Unavailable {
        assert_eq!(result.overall_confidence, 0.0);
    }
    result.summary_digest_hex().expect("result digests");
});
