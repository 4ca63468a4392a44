//! Replica runner: the same experiment under several seeds.
//!
//! Each replica builds its own coordinator from a seed and runs it to
//! completion.  Replicas share nothing, so with the `parallel` feature they
//! run on Rayon's thread pool; results always come back in seed order.

use tracing::{info, warn};

use crate::{ErrorRecord, RunSummary, SimObserver, SimResult, RootCoordinator};

/// Result of one replica.
#[derive(Debug)]
pub struct ReplicaOutcome<O> {
    pub index:  usize,
    pub seed:   u64,
    /// The run summary and the observer that watched the run, or the error
    /// that aborted it.
    pub result: Result<(RunSummary, O), ErrorRecord>,
}

impl<O> ReplicaOutcome<O> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run one replica per seed.
///
/// `build` turns a seed into a ready coordinator and the observer that
/// collects its output.  `num_threads` caps the Rayon pool when the
/// `parallel` feature is enabled and is ignored otherwise.
pub fn run_replicas<O, F>(
    seeds:       &[u64],
    num_threads: Option<usize>,
    build:       F,
) -> Vec<ReplicaOutcome<O>>
where
    O: SimObserver + Send,
    F: Fn(u64) -> SimResult<(RootCoordinator, O)> + Sync,
{
    info!(replicas = seeds.len(), "running replicas");

    #[cfg(not(feature = "parallel"))]
    {
        let _ = num_threads;
        seeds
            .iter()
            .enumerate()
            .map(|(index, &seed)| run_one(index, seed, &build))
            .collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let run_all = || -> Vec<ReplicaOutcome<O>> {
            seeds
                .par_iter()
                .enumerate()
                .map(|(index, &seed)| run_one(index, seed, &build))
                .collect()
        };
        match num_threads {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(run_all),
                Err(err) => {
                    warn!(%err, "could not build replica thread pool, using the global pool");
                    run_all()
                }
            },
            None => run_all(),
        }
    }
}

fn run_one<O, F>(index: usize, seed: u64, build: &F) -> ReplicaOutcome<O>
where
    O: SimObserver,
    F: Fn(u64) -> SimResult<(RootCoordinator, O)>,
{
    let result = build(seed).and_then(|(mut sim, mut observer)| {
        let summary = sim.run(&mut observer)?;
        Ok((summary, observer))
    });
    let result = result.map_err(|err| {
        warn!(replica = index, seed, error = %err, "replica failed");
        err.record()
    });
    ReplicaOutcome { index, seed, result }
}
