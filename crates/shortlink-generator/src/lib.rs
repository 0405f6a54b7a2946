pub mod random;

pub use random::RandomGenerator;

use shortlink_core::ShortCode;

/// Source of candidate short codes.
///
/// A generator never looks at storage; the store retries on collision.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Draws a candidate short code.
    fn generate(&self) -> Self::Output;
}
