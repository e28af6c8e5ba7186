use anyhow::{bail, Result};
use tracing::info;

use crate::cli::GenerateArgs;
use crate::dataset::save_dataset;
use crate::model::{Dataset, EntityRecord};
use crate::perturb::perturb;
use crate::pools::{pool_set, PoolEntry};

pub fn run(args: GenerateArgs) -> Result<()> {
    if args.size == 0 {
        bail!("dataset size must be at least 1");
    }

    let records = generate(&pool_set(), args.size, args.seed);
    let dataset = Dataset::from_records(records, &args.environment, &args.filename);
    let path = save_dataset(&dataset, &args.dataset_root)?;

    info!(
        path = %path.display(),
        items = dataset.items.len(),
        environment = %dataset.environment,
        seed = args.seed,
        "dataset written"
    );

    Ok(())
}

/// Two independent uniform draws per item (pool, then record) so every pool
/// carries equal weight regardless of its cardinality. The pools themselves
/// are read-only and must be non-empty; each draw copies the entry before
/// perturbing it.
pub fn generate(pools: &[&[PoolEntry]], size: usize, seed: u64) -> Vec<EntityRecord> {
    let mut rng = XorShift64::new(seed);

    let mut records = Vec::with_capacity(size);
    for index in 0..size {
        let pool = pools[rng.next_index(pools.len())];
        let mut record = pool[rng.next_index(pool.len())].to_record();
        record.query = perturb(&record.query, index);
        records.push(record);
    }

    records
}

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        // xorshift sticks at zero; remap the one degenerate seed.
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    fn next_index(&mut self, len: usize) -> usize {
        (self.next_u64() as usize) % len
    }
}
