use rand::seq::SliceRandom;
use rand::Rng;

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnpqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_=+";

const LENGTH: usize = 16;

/// Temporary password handed to admin-created users: mixed character
/// classes, returned exactly once, changed on first sign-in.
pub fn generate_temp_password() -> String {
    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = Vec::with_capacity(LENGTH);
    for class in [UPPER, LOWER, DIGITS, SYMBOLS] {
        chars.push(class[rng.gen_range(0..class.len())]);
        chars.push(class[rng.gen_range(0..class.len())]);
    }
    let all: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();
    while chars.len() < LENGTH {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);
    String::from_utf8(chars).unwrap_or_else(|_| "Temp-Password-1!".to_string())
}
