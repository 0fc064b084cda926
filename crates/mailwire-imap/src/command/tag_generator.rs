//! Command tags.

/// Generates command tags: a prefix letter followed by at least four digits.
///
/// The counter starts at 1 and wraps around at `u32::MAX`; a tag is not
/// reused before the wrap.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix letter.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Returns the next tag.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, self.counter)
    }

    /// Returns the number of the most recent tag.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_sequential() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next(), "A0001");
        assert_eq!(tags.next(), "A0002");
        assert_eq!(tags.current(), 2);
    }

    #[test]
    fn tags_widen_past_four_digits() {
        let mut tags = TagGenerator {
            counter: 9999,
            prefix: 'B',
        };
        assert_eq!(tags.next(), "B10000");
    }

    #[test]
    fn counter_wraps() {
        let mut tags = TagGenerator {
            counter: u32::MAX,
            prefix: 'A',
        };
        assert_eq!(tags.next(), "A0000");
        assert_eq!(tags.next(), "A0001");
    }
}
