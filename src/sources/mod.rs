//! Independent, possibly slow providers of the values a lifestyle query
//! needs. Providers are plain synchronous calls; the composer decides how
//! they are scheduled.

mod directory;

use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::core::{PersonRecord, Result, SuperStrategy};

pub use directory::PersonDirectory;

pub const RETIREMENT_AGE_RANGE: (i32, i32) = (60, 70);
pub const START_SUPER_AGE_RANGE: (i32, i32) = (18, 30);
pub const CONTRIBUTION_PERCENT_RANGE: (i32, i32) = (3, 15);
pub const LATENCY_STEP: Duration = Duration::from_millis(100);

pub trait Providers: Send + Sync {
    fn lookup_person(&self, full_name: &str) -> Result<PersonRecord>;
    fn start_super_age(&self) -> Result<i32>;
    fn strategy(&self) -> Result<String>;
    fn contribution(&self) -> Result<i32>;
    fn retirement_age(&self) -> Result<i32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConfig {
    /// Fixed seed for reproducible draws; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub max_latency: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_latency: LATENCY_STEP * 9,
        }
    }
}

/// One random stream per source so a seeded run draws the same values no
/// matter which worker reaches which source first.
#[derive(Copy, Clone, Debug)]
enum Stream {
    Person = 1,
    StartSuperAge = 2,
    Strategy = 3,
    Contribution = 4,
    RetirementAge = 5,
}

pub struct SimulatedProviders {
    directory: PersonDirectory,
    latency_steps: u32,
    person_rng: Mutex<StdRng>,
    start_age_rng: Mutex<StdRng>,
    strategy_rng: Mutex<StdRng>,
    contribution_rng: Mutex<StdRng>,
    retirement_rng: Mutex<StdRng>,
}

impl SimulatedProviders {
    pub fn new(directory: PersonDirectory, config: SourceConfig) -> Self {
        let base_seed = config.seed;
        let stream_rng = |stream: Stream| {
            let rng = match base_seed {
                Some(seed) => StdRng::seed_from_u64(derive_seed(seed, stream)),
                None => StdRng::from_entropy(),
            };
            Mutex::new(rng)
        };
        let latency_steps = (config.max_latency.as_millis() / LATENCY_STEP.as_millis()) as u32;

        Self {
            directory,
            latency_steps,
            person_rng: stream_rng(Stream::Person),
            start_age_rng: stream_rng(Stream::StartSuperAge),
            strategy_rng: stream_rng(Stream::Strategy),
            contribution_rng: stream_rng(Stream::Contribution),
            retirement_rng: stream_rng(Stream::RetirementAge),
        }
    }

    pub fn directory(&self) -> &PersonDirectory {
        &self.directory
    }

    fn simulate_latency(&self, rng: &mut StdRng) {
        let steps = rng.gen_range(0..=self.latency_steps);
        if steps > 0 {
            thread::sleep(LATENCY_STEP * steps);
        }
    }

    fn draw<T>(&self, what: &str, stream: &Mutex<StdRng>, f: impl FnOnce(&mut StdRng) -> T) -> T
    where
        T: std::fmt::Debug,
    {
        let current = thread::current();
        let worker = current.name().unwrap_or("unnamed");
        debug!(worker, "retrieving {what}");
        let mut rng = stream.lock();
        self.simulate_latency(&mut *rng);
        let value = f(&mut *rng);
        debug!(worker, ?value, "retrieved {what}");
        value
    }
}

impl Providers for SimulatedProviders {
    fn lookup_person(&self, full_name: &str) -> Result<PersonRecord> {
        self.draw("person", &self.person_rng, |_| self.directory.lookup(full_name))
    }

    fn start_super_age(&self) -> Result<i32> {
        let (lo, hi) = START_SUPER_AGE_RANGE;
        Ok(self.draw("start super age", &self.start_age_rng, |rng| {
            rng.gen_range(lo..=hi)
        }))
    }

    fn strategy(&self) -> Result<String> {
        let strategy = self.draw("super strategy", &self.strategy_rng, |rng| {
            SuperStrategy::ALL[rng.gen_range(0..SuperStrategy::ALL.len())]
        });
        Ok(strategy.name().to_string())
    }

    fn contribution(&self) -> Result<i32> {
        let (lo, hi) = CONTRIBUTION_PERCENT_RANGE;
        Ok(self.draw("contribution", &self.contribution_rng, |rng| {
            rng.gen_range(lo..=hi)
        }))
    }

    fn retirement_age(&self) -> Result<i32> {
        let (lo, hi) = RETIREMENT_AGE_RANGE;
        Ok(self.draw("retirement age", &self.retirement_rng, |rng| {
            rng.gen_range(lo..=hi)
        }))
    }
}

fn derive_seed(base_seed: u64, stream: Stream) -> u64 {
    splitmix64(base_seed ^ ((stream as u64) << 32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
