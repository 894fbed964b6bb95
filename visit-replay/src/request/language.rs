//! This module contains the pool of `Accept-Language` header values used to
//! vary the locale of replayed visits.

/// `Accept-Language` values cycled through by replayed requests.
pub const ACCEPT_LANGUAGES: [&str; 12] = [
    "en-us,en;q=0.8",
    "de-de,de;q=0.8,en-us;q=0.5,en;q=0.3",
    "fr-fr,fr;q=0.8,en-us;q=0.5,en;q=0.3",
    "es-es,es;q=0.8,en;q=0.5",
    "it-it,it;q=0.8,en-us;q=0.5,en;q=0.3",
    "nl-nl,nl;q=0.8,en-us;q=0.5,en;q=0.3",
    "pl-pl,pl;q=0.8,en;q=0.5",
    "pt-br,pt;q=0.8,en-us;q=0.5,en;q=0.3",
    "ru-ru,ru;q=0.8,en-us;q=0.5,en;q=0.3",
    "sv-se,sv;q=0.8,en-us;q=0.5,en;q=0.3",
    "ja-jp,ja;q=0.8,en-us;q=0.5,en;q=0.3",
    "zh-cn,zh;q=0.8,en-us;q=0.5,en;q=0.3",
];

/// Returns the language at `index`, wrapping around the pool.
#[must_use]
pub fn nth_language(index: usize) -> &'static str {
    ACCEPT_LANGUAGES[index % ACCEPT_LANGUAGES.len()]
}

/// A counter over [`ACCEPT_LANGUAGES`], incremented on every tracked request.
///
/// Each replay owns its own rotation, so replays running in the same process
/// don't influence each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageRotation {
    /// Number of languages handed out so far.
    index: usize,
}

impl LanguageRotation {
    /// Returns the next language of the pool.
    pub fn next_language(&mut self) -> &'static str {
        let language = nth_language(self.index);
        self.index = self.index.wrapping_add(1);
        language
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps_around() {
        let mut rotation = LanguageRotation::default();
        let languages: Vec<_> = (0..=ACCEPT_LANGUAGES.len())
            .map(|_| rotation.next_language())
            .collect();

        assert_eq!(languages[0], ACCEPT_LANGUAGES[0]);
        assert_eq!(languages[1], ACCEPT_LANGUAGES[1]);
        assert_eq!(languages[ACCEPT_LANGUAGES.len()], ACCEPT_LANGUAGES[0]);
    }

    #[test]
    fn test_rotations_are_independent() {
        let mut first = LanguageRotation::default();
        let mut second = LanguageRotation::default();
        first.next_language();

        assert_eq!(second.next_language(), ACCEPT_LANGUAGES[0]);
        assert_eq!(first.next_language(), ACCEPT_LANGUAGES[1]);
    }
}
