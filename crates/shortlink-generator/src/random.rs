use crate::Generator;
use parking_lot::Mutex;
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shortlink_core::ShortCode;

pub const DEFAULT_CODE_LENGTH: usize = 7;
pub const MIN_CODE_LENGTH: usize = 6;

/// Draws fixed-length codes from `[A-Za-z0-9]`.
///
/// Codes are independent random draws with no sequential component, so
/// they cannot be enumerated from one another.
#[derive(Debug)]
pub struct RandomGenerator<R = StdRng> {
    length: usize,
    rng: Mutex<R>,
}

impl RandomGenerator<StdRng> {
    /// Creates a generator seeded from the operating system.
    ///
    /// Lengths below [`MIN_CODE_LENGTH`] are raised to it.
    pub fn new(length: usize) -> Self {
        Self::with_rng(length, StdRng::from_os_rng())
    }

    /// Creates a reproducible generator for tests.
    pub fn seeded(length: usize, seed: u64) -> Self {
        Self::with_rng(length, StdRng::seed_from_u64(seed))
    }
}

impl Default for RandomGenerator<StdRng> {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl<R: Rng + Send + 'static> RandomGenerator<R> {
    pub fn with_rng(length: usize, rng: R) -> Self {
        Self {
            length: length.max(MIN_CODE_LENGTH),
            rng: Mutex::new(rng),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    fn draw(&self) -> String {
        let mut rng = self.rng.lock();
        (0..self.length)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    }
}

impl<R: Rng + Send + 'static> Generator for RandomGenerator<R> {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        ShortCode::new_unchecked(self.draw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_have_requested_length_and_alphabet() {
        let generator = RandomGenerator::new(9);

        for _ in 0..200 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), 9);
            assert!(code.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn length_is_clamped_to_minimum() {
        let generator = RandomGenerator::new(2);
        assert_eq!(generator.length(), MIN_CODE_LENGTH);
        assert_eq!(generator.generate().as_str().len(), MIN_CODE_LENGTH);
    }

    #[test]
    fn generated_codes_pass_custom_validation() {
        let generator = RandomGenerator::default();
        let code = generator.generate();
        assert!(ShortCode::new(code.as_str()).is_ok());
    }

    #[test]
    fn same_seed_same_sequence() {
        let a = RandomGenerator::seeded(7, 42);
        let b = RandomGenerator::seeded(7, 42);

        for _ in 0..10 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn draws_are_not_repeated() {
        let generator = RandomGenerator::seeded(7, 7);
        let codes: HashSet<_> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomGenerator>();
    }
}
