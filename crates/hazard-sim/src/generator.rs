use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

/// Fill-race work: check the gap and fill it. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillGap;

/// Frequency-count work: bump the counter for `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub key: String,
}

/// Scratch-leak work: a request made on behalf of `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Login {
    pub user_id: u64,
}

/// Key for index `i` of the key universe.
pub fn item_key(i: usize) -> String {
    format!("item{}", i)
}

/// `count` fill-race work items.
pub fn fill_gaps(count: usize) -> impl Iterator<Item = FillGap> {
    std::iter::repeat(FillGap).take(count)
}

/// `count` entries with fresh random keys, valued `1..=count`.
pub fn fresh_entries(count: usize) -> impl Iterator<Item = (String, u64)> {
    (1..=count as u64).map(|i| (Uuid::new_v4().to_string(), i))
}

/// One login per user id, in order.
pub fn logins<I>(user_ids: I) -> impl Iterator<Item = Login>
where
    I: IntoIterator<Item = u64>,
{
    user_ids.into_iter().map(|user_id| Login { user_id })
}

/// Lazy stream of [`Tally`] items with keys drawn uniformly from the universe.
///
/// Owns its generator, so each worker draws independently. Not restartable.
pub struct Tallies {
    rng: Box<dyn RngCore>,
    remaining: u64,
    item_count: usize,
}

impl Tallies {
    /// Draw from the calling thread's generator.
    pub fn from_thread(count: u64, item_count: usize) -> Self {
        Self::with_rng(Box::new(rand::thread_rng()), count, item_count)
    }

    /// Draw from a reproducible generator.
    pub fn from_seed(count: u64, item_count: usize, seed: u64) -> Self {
        Self::with_rng(Box::new(ChaCha8Rng::seed_from_u64(seed)), count, item_count)
    }

    fn with_rng(rng: Box<dyn RngCore>, count: u64, item_count: usize) -> Self {
        // An empty universe has nothing to draw from.
        let remaining = if item_count == 0 { 0 } else { count };
        Tallies {
            rng,
            remaining,
            item_count,
        }
    }
}

impl Iterator for Tallies {
    type Item = Tally;

    fn next(&mut self) -> Option<Tally> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let i = self.rng.gen_range(0..self.item_count);
        Some(Tally { key: item_key(i) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

/// `count` tallies, seeded when `seed` is given.
pub fn tallies(count: u64, item_count: usize, seed: Option<u64>) -> Tallies {
    match seed {
        Some(seed) => Tallies::from_seed(count, item_count, seed),
        None => Tallies::from_thread(count, item_count),
    }
}

/// A contiguous slice of the frequency count's total work.
///
/// Chunks let a run of millions of increments go through the pool without
/// materialising every item up front; the worker that picks up a chunk
/// generates its tallies itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyChunk {
    pub index: usize,
    pub len: u64,
}

impl TallyChunk {
    /// This chunk's tallies. With a seed, every chunk gets its own ChaCha
    /// stream, so results do not depend on which unit runs which chunk.
    pub fn tallies(&self, item_count: usize, seed: Option<u64>) -> Tallies {
        match seed {
            Some(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(self.index as u64);
                Tallies::with_rng(Box::new(rng), self.len, item_count)
            }
            None => Tallies::from_thread(self.len, item_count),
        }
    }
}

/// Split `total` items into at most `parts` non-empty chunks whose lengths
/// differ by at most one.
pub fn chunks(total: u64, parts: usize) -> Vec<TallyChunk> {
    let parts = parts.max(1) as u64;
    let base = total / parts;
    let extra = total % parts;

    (0..parts)
        .map(|i| TallyChunk {
            index: i as usize,
            len: base + u64::from(i < extra),
        })
        .filter(|c| c.len > 0)
        .collect()
}
