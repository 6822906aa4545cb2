//! Username rules and the generator used for default accounts.

use social_types::ErrorCode;
use uuid::Uuid;

pub const MIN_LEN: usize = 3;
pub const MAX_LEN: usize = 32;
/// Name served by the avatar route; never assignable.
pub const RESERVED: &str = "default";

const ADJECTIVES: &[&str] = &[
    "Brave", "Calm", "Clever", "Cosmic", "Crimson", "Daring", "Eager", "Fancy", "Fierce",
    "Gentle", "Golden", "Happy", "Jolly", "Lucky", "Mighty", "Nimble", "Quiet", "Rapid",
    "Silent", "Sneaky", "Sunny", "Swift", "Tiny", "Witty",
];

const NOUNS: &[&str] = &[
    "Badger", "Comet", "Dragon", "Falcon", "Fox", "Golem", "Griffin", "Koala", "Lynx",
    "Meteor", "Otter", "Panda", "Pixel", "Raven", "Rocket", "Sphinx", "Tiger", "Walrus",
    "Wizard", "Yeti",
];

const TIMESTAMP_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-~";

/// Check a requested username. All violated rules are reported together.
pub fn validate(name: &str) -> Vec<ErrorCode> {
    let mut errors = Vec::new();
    let len = name.chars().count();
    if len < MIN_LEN {
        errors.push(ErrorCode::TooShort);
    }
    if len > MAX_LEN {
        errors.push(ErrorCode::TooLong);
    }
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.push(ErrorCode::InvalidCharacters);
    }
    if !name.chars().any(|c| c.is_ascii_alphabetic()) {
        errors.push(ErrorCode::MustContainLetters);
    }
    if name == RESERVED {
        errors.push(ErrorCode::AlreadyTaken);
    }
    errors
}

/// `<Adjective><Noun>_<timestamp>`, the timestamp encoded in base 65.
pub fn generate(timestamp_ms: i64) -> String {
    let entropy = Uuid::new_v4();
    let bytes = entropy.as_bytes();
    let adjective = pick(ADJECTIVES, u16::from_be_bytes([bytes[0], bytes[1]]));
    let noun = pick(NOUNS, u16::from_be_bytes([bytes[2], bytes[3]]));
    format!("{adjective}{noun}_{}", encode_timestamp(timestamp_ms))
}

fn pick(words: &'static [&'static str], roll: u16) -> &'static str {
    words[usize::from(roll) * words.len() / (usize::from(u16::MAX) + 1)]
}

fn encode_timestamp(timestamp_ms: i64) -> String {
    let base = TIMESTAMP_ALPHABET.len() as u64;
    let mut n = timestamp_ms.max(0) as u64;
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(TIMESTAMP_ALPHABET[(n % base) as usize] as char);
        n /= base;
    }
    digits.iter().rev().collect()
}
