#![no_main]

use libfuzzer_sys::fuzz_target;
use trueframe_attest::AttestationStatement;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Some(statement) = AttestationStatement::decode_b64(text) else {
        return;
    };
    // Anything that decodes must re-encode, and the re-encoding must decode
    // back to the same statement.
    let encoded = statement.encode_b64().unwrap_or_default();
    if let Some(back) = AttestationStatement::decode_b64(&encoded) {
        assert_eq!(back, statement);
    }
});
