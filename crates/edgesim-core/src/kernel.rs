//! Clock, pending events and random generator shared by the simulation and its contexts.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::event::{Event, EventData};
use crate::logging;
use crate::Id;

/// Negative delays down to this value are rounded to zero.
const DELAY_TOLERANCE: f64 = 1e-12;

#[derive(Clone, Copy, Debug)]
struct Timestamp(f64);

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

pub(crate) struct Kernel {
    clock: f64,
    next_seq: u64,
    pending: BTreeMap<(Timestamp, u64), Event>,
    rng: Pcg64,
}

impl Kernel {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.,
            next_seq: 0,
            pending: BTreeMap::new(),
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn schedule<T: EventData>(&mut self, data: T, src: Id, dst: Id, delay: f64) {
        let event = Event {
            seq: self.next_seq,
            time: self.clock + delay.max(0.),
            src,
            dst,
            data: Box::new(data),
        };
        if delay < -DELAY_TOLERANCE {
            logging::scheduled_in_past(&event, delay);
            panic!("Event {} is scheduled in the past (delay {})", event.type_name(), delay);
        }
        self.next_seq += 1;
        self.pending.insert((Timestamp(event.time), event.seq), event);
    }

    /// Removes the earliest event and advances the clock to its time.
    pub fn pop(&mut self) -> Option<Event> {
        let (_, event) = self.pending.pop_first()?;
        self.clock = event.time;
        Some(event)
    }

    pub fn peek_time(&self) -> Option<f64> {
        self.pending.keys().next().map(|(time, _)| time.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.gen_range(range)
    }

    pub fn sample<T, D: Distribution<T>>(&mut self, dist: &D) -> T {
        dist.sample(&mut self.rng)
    }
}
