//! Counters of in-flight transfers.

use std::collections::BTreeMap;

use super::Link;

/// Number of in-flight transfers per (access point, link).
#[derive(Clone, Debug, Default)]
pub struct CongestionState {
    counters: BTreeMap<(usize, Link), u32>,
}

impl CongestionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, access_point: usize, link: Link) {
        *self.counters.entry((access_point, link)).or_insert(0) += 1;
    }

    pub fn finish(&mut self, access_point: usize, link: Link) {
        match self.counters.get_mut(&(access_point, link)) {
            Some(count) if *count > 0 => *count -= 1,
            _ => log::warn!(
                "Unmatched transfer finish at access point {} on {:?} link",
                access_point,
                link
            ),
        }
    }

    pub fn count(&self, access_point: usize, link: Link) -> u32 {
        self.counters.get(&(access_point, link)).copied().unwrap_or(0)
    }

    /// Total number of in-flight transfers.
    pub fn total(&self) -> u32 {
        self.counters.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand_pcg::Pcg64;

    use super::*;

    #[test]
    fn counters_are_independent() {
        let mut state = CongestionState::new();
        state.start(0, Link::Wlan);
        state.start(0, Link::Wlan);
        state.start(0, Link::Wan);
        state.start(1, Link::Wlan);
        assert_eq!(state.count(0, Link::Wlan), 2);
        assert_eq!(state.count(0, Link::Wan), 1);
        assert_eq!(state.count(1, Link::Wlan), 1);
        assert_eq!(state.count(1, Link::Man), 0);
        assert_eq!(state.total(), 4);
    }

    #[test]
    fn unmatched_finish_keeps_zero() {
        let mut state = CongestionState::new();
        state.finish(3, Link::Man);
        assert_eq!(state.count(3, Link::Man), 0);
        state.start(3, Link::Man);
        state.finish(3, Link::Man);
        state.finish(3, Link::Man);
        assert_eq!(state.count(3, Link::Man), 0);
    }

    #[test]
    fn counter_equals_unmatched_starts() {
        let links = [Link::Wlan, Link::Man, Link::Wan];
        let mut rng = Pcg64::seed_from_u64(17);
        let mut state = CongestionState::new();
        let mut expected = BTreeMap::<(usize, Link), u32>::new();
        for _ in 0..10000 {
            let key = (rng.gen_range(0..4), links[rng.gen_range(0..3)]);
            let pending = expected.entry(key).or_insert(0);
            if *pending > 0 && rng.gen_bool(0.5) {
                state.finish(key.0, key.1);
                *pending -= 1;
            } else {
                state.start(key.0, key.1);
                *pending += 1;
            }
            assert_eq!(state.count(key.0, key.1), *pending);
        }
        for ((ap, link), pending) in expected {
            assert_eq!(state.count(ap, link), pending);
        }
    }
}
