use std::sync::Arc;

use super::error::PoolError;

/// Ceiling on concurrently running tasks unless configured otherwise.
pub const DEFAULT_MAX_TASKS: usize = 256;

/// Concurrency settings shared by every fan-out of a split map.
///
/// At most `max_tasks` cells are worked on at once, and never more than the
/// machine has cores for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parallelism {
	pub max_tasks: usize,
}

impl Default for Parallelism {
	fn default() -> Self {
		Self { max_tasks: DEFAULT_MAX_TASKS }
	}
}

impl Parallelism {
	pub fn new(max_tasks: usize) -> Self {
		Self { max_tasks }
	}

	/// A single worker; cells are still processed in the pool, one at a time.
	pub fn sequential() -> Self {
		Self::new(1)
	}

	/// Number of worker threads actually started.
	pub fn threads(&self) -> usize {
		let cores = std::thread::available_parallelism()
			.map(|n| n.get())
			.unwrap_or(1);
		self.max_tasks.min(cores).max(1)
	}

	pub fn build_pool(&self) -> Result<Arc<rayon::ThreadPool>, PoolError> {
		if self.max_tasks == 0 {
			return Err(PoolError::ZeroTasks);
		}
		let pool = rayon::ThreadPoolBuilder::new()
			.num_threads(self.threads())
			.thread_name(|i| format!("density-split-{}", i))
			.build()?;
		log::debug!("started worker pool with {} threads", pool.current_num_threads());
		Ok(Arc::new(pool))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn thread_count_is_capped() {
		assert_eq!(Parallelism::sequential().threads(), 1);
		assert!(Parallelism::default().threads() <= DEFAULT_MAX_TASKS);
		assert!(Parallelism::new(3).threads() <= 3);
	}

	#[test]
	fn zero_tasks_is_rejected() {
		assert!(matches!(Parallelism::new(0).build_pool(), Err(PoolError::ZeroTasks)));
	}

	#[test]
	fn pool_honours_cap() {
		let pool = Parallelism::new(2).build_pool().unwrap();
		assert!(pool.current_num_threads() <= 2);
	}
}
