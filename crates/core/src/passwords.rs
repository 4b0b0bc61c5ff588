//! Candidate password generation and policy pre-checks.
//!
//! The console proposes candidate passwords before a reset; the directory
//! remains the final authority and may still reject a candidate.

use rand::Rng;

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%&*";

/// Generate a random candidate password of the given length.
///
/// The candidate always contains at least one character from each class
/// (upper, lower, digit, symbol) so it survives the common AD complexity
/// rule. Lengths below 4 are raised to 4 to keep that guarantee.
pub fn generate_candidate(length: usize) -> String {
    let length = length.max(4);
    let mut rng = rand::thread_rng();

    let mut chars: Vec<char> = Vec::with_capacity(length);
    chars.push(pick(&mut rng, UPPER));
    chars.push(pick(&mut rng, LOWER));
    chars.push(pick(&mut rng, DIGITS));
    chars.push(pick(&mut rng, SYMBOLS));

    let all: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();
    while chars.len() < length {
        chars.push(pick(&mut rng, &all));
    }

    // Shuffle so the guaranteed classes aren't always at the front
    for i in (1..chars.len()).rev() {
        let j = rng.gen_range(0..=i);
        chars.swap(i, j);
    }

    chars.into_iter().collect()
}

/// Check a candidate against minimum length and the standard complexity
/// rule (three of four character classes).
///
/// This is a pre-check only; history and other server-side rules can still
/// reject the password.
pub fn meets_requirements(password: &str, min_length: usize, complexity_required: bool) -> bool {
    if password.chars().count() < min_length {
        return false;
    }
    if !complexity_required {
        return true;
    }

    let classes = [
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    classes.iter().filter(|&&b| b).count() >= 3
}

fn pick(rng: &mut impl Rng, set: &[u8]) -> char {
    set[rng.gen_range(0..set.len())] as char
}
