//! Chronologically sortable record keys.
//!
//! 8 characters of millisecond timestamp followed by 12 random characters,
//! drawn from an alphabet whose ASCII order matches its digit order. Keys
//! made in the same millisecond reuse the random tail incremented by one, so
//! keys from one generator are strictly increasing.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

pub struct PushIdGenerator {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
    rng: SmallRng,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            last_millis: i64::MIN,
            last_random: [0; RANDOM_CHARS],
            rng,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn next_id_at(&mut self, millis: i64) -> String {
        if millis == self.last_millis {
            // Increment the random tail, carrying from the right.
            for digit in self.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            for digit in self.last_random.iter_mut() {
                *digit = self.rng.gen_range(0..64);
            }
            self.last_millis = millis;
        }

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut time_chars = [0u8; TIME_CHARS];
        let mut now = millis.max(0) as u64;
        for slot in time_chars.iter_mut().rev() {
            *slot = ALPHABET[(now % 64) as usize];
            now /= 64;
        }
        id.extend(time_chars.iter().map(|&b| b as char));
        id.extend(self.last_random.iter().map(|&d| ALPHABET[d as usize] as char));
        id
    }
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
