use itertools::Itertools;
use rand::Rng;

use crate::error::Result;
use crate::profile::{LatencyProfile, ProfileBook};
use crate::transition::{KeyboardLayout, TransitionClass};
use crate::words::Sentence;

/// Jitter multiplier range applied to every base delay
pub const JITTER_MIN: f64 = 1.0;
pub const JITTER_MAX: f64 = 1.5;

/// Precomputed delays (ms) between each adjacent character pair of a sentence
#[derive(Debug, Clone, PartialEq)]
pub struct GhostTrace {
    profile_id: String,
    delays: Vec<f64>,
}

impl GhostTrace {
    pub fn from_delays(profile_id: impl Into<String>, delays: Vec<f64>) -> Self {
        Self {
            profile_id: profile_id.into(),
            delays,
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.delays.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

/// Turns a sentence plus a latency profile into a ghost trace
#[derive(Debug, Clone, Default)]
pub struct GhostGenerator {
    layout: KeyboardLayout,
}

impl GhostGenerator {
    pub fn new(layout: KeyboardLayout) -> Self {
        Self { layout }
    }

    pub fn transitions(&self, sentence: &Sentence) -> Vec<TransitionClass> {
        sentence
            .chars()
            .iter()
            .tuple_windows()
            .map(|(a, b)| self.layout.classify(*a, *b))
            .collect()
    }

    /// Unjittered table values, one per adjacent pair
    pub fn base_delays(&self, sentence: &Sentence, profile: &LatencyProfile) -> Result<Vec<f64>> {
        self.transitions(sentence)
            .into_iter()
            .map(|class| profile.latency(class))
            .collect()
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        sentence: &Sentence,
        profiles: &ProfileBook,
        profile_id: &str,
        rng: &mut R,
    ) -> Result<GhostTrace> {
        let profile = profiles.get(profile_id)?;
        let delays = self
            .base_delays(sentence, profile)?
            .into_iter()
            .map(|base| base * rng.gen_range(JITTER_MIN..JITTER_MAX))
            .collect();
        Ok(GhostTrace::from_delays(profile_id, delays))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GhostError;
    use crate::profile::DEFAULT_PROFILE;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn trace_has_one_delay_per_pair_within_jitter_bounds() {
        let book = ProfileBook::builtin().unwrap();
        let generator = GhostGenerator::default();
        let mut rng = StdRng::seed_from_u64(42);

        for text in ["ab", "the quick brown fox", "  zz  qq", "jump over"] {
            let sentence = Sentence::new(text);
            let base = generator
                .base_delays(&sentence, book.get(DEFAULT_PROFILE).unwrap())
                .unwrap();
            let trace = generator
                .generate(&sentence, &book, DEFAULT_PROFILE, &mut rng)
                .unwrap();

            assert_eq!(trace.len(), sentence.len() - 1);
            for (delay, base) in trace.delays().iter().zip(&base) {
                assert!(*delay >= *base);
                assert!(*delay < base * JITTER_MAX);
            }
        }
    }

    #[test]
    fn base_delays_follow_profile_table() {
        let book = ProfileBook::builtin().unwrap();
        let profile = book.get(DEFAULT_PROFILE).unwrap();
        let generator = GhostGenerator::default();

        // Q->A is LL, A->' ' is LS, ' '->J is SR
        let base = generator
            .base_delays(&Sentence::new("QA J"), profile)
            .unwrap();
        assert_eq!(base, vec![175.8, 125.0, 156.3]);
    }

    #[test]
    fn single_char_sentence_yields_empty_trace() {
        let book = ProfileBook::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let trace = GhostGenerator::default()
            .generate(&Sentence::new("a"), &book, DEFAULT_PROFILE, &mut rng)
            .unwrap();
        assert!(trace.is_empty());
    }

    #[test]
    fn unknown_profile_fails_generation() {
        let book = ProfileBook::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = GhostGenerator::default()
            .generate(&Sentence::new("hello"), &book, "MISSING", &mut rng)
            .unwrap_err();
        assert!(matches!(err, GhostError::UnknownProfile(_)));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let book = ProfileBook::builtin().unwrap();
        let generator = GhostGenerator::default();
        let sentence = Sentence::new("steady rhythm");

        let a = generator
            .generate(&sentence, &book, DEFAULT_PROFILE, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = generator
            .generate(&sentence, &book, DEFAULT_PROFILE, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.profile_id(), DEFAULT_PROFILE);
    }
}
