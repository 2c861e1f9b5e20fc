use std::time::{SystemTime, UNIX_EPOCH};

use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// An alphanumeric token, used to keep blob paths unique
pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Milliseconds since the unix epoch
pub fn epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is past the epoch")
        .as_millis()
}
