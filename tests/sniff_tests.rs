use pixtext::{CodecError, ErrorKind, Tier, sniff};

#[test]
fn test_headers_select_tier() {
    assert_eq!(sniff("LOSSLESS MANIFEST v2\nsource: x").unwrap(), Tier::Lossless);
    assert_eq!(sniff("LOSSY-ALGO MANIFEST v2\n").unwrap(), Tier::LossyAlgo);
    assert_eq!(sniff("LOSSY-NLP DESCRIPTION v2").unwrap(), Tier::Description);
}

#[test]
fn test_header_after_blank_lines() {
    let text = "\n\n   \nLOSSY-ALGO MANIFEST v2\nnote: x";
    assert_eq!(sniff(text).unwrap(), Tier::LossyAlgo);
}

#[test]
fn test_header_too_far_down_is_ignored() {
    let text = "a\nb\nc\nd\nLOSSLESS MANIFEST v2";
    assert!(matches!(sniff(text), Err(CodecError::UnrecognizedManifest)));
}

#[test]
fn test_bare_description_json() {
    let text = "{\n  \"schema\": \"LOSSY-IMAGE-DESCRIPTION v2\",\n  \"source\": \"x\"\n}";
    assert_eq!(sniff(text).unwrap(), Tier::Description);
}

#[test]
fn test_empty_and_prose_rejected() {
    for text in ["", "\n\n", "a picture of a cat on a mat", "LOSSLESS MANIFEST v1"] {
        let err = sniff(text).unwrap_err();
        assert!(matches!(err, CodecError::UnrecognizedManifest));
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }
}

#[test]
fn test_decode_of_prose_fails_before_parsing() {
    let err = pixtext::decode("hello world", &pixtext::DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, CodecError::UnrecognizedManifest));
}
