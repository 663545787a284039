//! Text redaction applied before anything leaves the process.
//!
//! Cleaning is pure and idempotent: `clean_text(&clean_text(s)) == clean_text(s)`.

use regex::Regex;
use std::sync::LazyLock;

/// Placeholder for a masked mobile number.
pub const PHONE_MASK: &str = "[phone]";
/// Placeholder for a masked ID number.
pub const ID_MASK: &str = "[id]";

/// Platform control codes such as `[CQ:image,file=...]`.
static PLATFORM_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[CQ:[^\]]*\]").expect("valid platform code pattern"));

/// 18-character resident ID numbers.
static ID_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{17}[\dXx]").expect("valid id number pattern"));

/// Mainland mobile numbers.
static PHONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"1[3-9]\d{9}").expect("valid phone number pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Strip platform markup, mask sensitive numbers, and normalize whitespace.
///
/// ID numbers are masked before phone numbers; an ID can contain a
/// phone-shaped run of digits.
pub fn clean_text(text: &str) -> String {
    let text = PLATFORM_CODE.replace_all(text, " ");
    let text = ID_NUMBER.replace_all(&text, ID_MASK);
    let text = PHONE_NUMBER.replace_all(&text, PHONE_MASK);
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}
