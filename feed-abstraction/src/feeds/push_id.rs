/// Alphabet in ASCII order, so that keys compare the same way as the instants they encode
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const SUFFIX_CHARS: usize = 12;

/// Generates 20-character keys for pushed children.
///
/// The first 8 characters encode the push time in milliseconds, the last 12 a counter
/// that increments for pushes within the same millisecond. Keys therefore sort in push
/// order, also when the clock steps backwards (the last seen time is reused).
#[derive(Debug, Clone, Default)]
pub struct PushIdGenerator {
    last_ms: i64,
    suffix: [u8; SUFFIX_CHARS],
}

impl PushIdGenerator {
    pub fn next_id(&mut self, now_ms: i64) -> String {
        if now_ms > self.last_ms {
            self.last_ms = now_ms;
            self.suffix = [0; SUFFIX_CHARS];
        } else {
            self.increment_suffix();
        }

        let mut id = [0u8; TIME_CHARS + SUFFIX_CHARS];
        let mut ms = self.last_ms.max(0) as u64;
        for slot in id[..TIME_CHARS].iter_mut().rev() {
            *slot = PUSH_CHARS[(ms % 64) as usize];
            ms /= 64;
        }
        for (slot, digit) in id[TIME_CHARS..].iter_mut().zip(self.suffix.iter()) {
            *slot = PUSH_CHARS[*digit as usize];
        }

        id.iter().map(|b| *b as char).collect()
    }

    fn increment_suffix(&mut self) {
        for digit in self.suffix.iter_mut().rev() {
            if *digit < 63 {
                *digit += 1;
                return;
            }
            *digit = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_sort_in_push_order() {
        let mut ids = PushIdGenerator::default();
        let generated = vec![
            ids.next_id(1_700_000_000_000),
            ids.next_id(1_700_000_000_000),
            ids.next_id(1_700_000_000_001),
            ids.next_id(1_699_999_999_999),
            ids.next_id(1_700_000_060_000),
        ];

        let mut sorted = generated.clone();
        sorted.sort();
        assert_eq!(generated, sorted);
        assert!(generated.iter().all(|id| id.len() == 20));

        let mut unique = generated.clone();
        unique.dedup();
        assert_eq!(unique.len(), generated.len());
    }

    #[test]
    fn test_suffix_carries() {
        let mut ids = PushIdGenerator::default();
        let mut previous = ids.next_id(5);
        for _ in 0..200 {
            let next = ids.next_id(5);
            assert!(next > previous);
            previous = next;
        }
    }
}
