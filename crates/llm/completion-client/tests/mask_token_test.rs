//! Tests for `mask_token`: short keys are fully hidden, longer keys keep 7-char head and 4-char tail.

use completion_client::mask_token;

#[test]
fn mask_short_key_fully() {
    assert_eq!(mask_token(""), "***");
    assert_eq!(mask_token("sk-12345678"), "***");
}

#[test]
fn mask_long_key_keeps_head_and_tail() {
    assert_eq!(mask_token("sk-proj-abcdefghijklmnop"), "sk-proj***mnop");
}

#[test]
fn mask_non_ascii_key_fully() {
    assert_eq!(mask_token("ключ-ключ-ключ-ключ"), "***");
}
