pub mod cell;
pub mod color;
pub mod coverage;
pub mod density;
pub mod error;
pub mod parallel;
pub mod render;

use std::sync::Arc;

use rayon::prelude::*;

use cell::{Cell, Rect};
use density::{Density, DensitySource};
use error::{BuildError, DensityError, PoolError, SplitError};
use parallel::Parallelism;

/// Density-balanced partition of a single channel.
///
/// Starts as one cell covering the whole domain. Every call to `split`
/// halves the mass of every cell across its longest axis, so after `g`
/// generations there are exactly `2^g` cells. Their regions never overlap
/// and always cover the domain, which is what lets cells be split and
/// rendered in parallel without locks.
#[derive(Clone, Debug)]
pub struct SplitMap {
	source: Arc<DensitySource>,
	cells: Vec<Cell>,
	generation: u32,
	pool: Arc<rayon::ThreadPool>,
}

impl SplitMap {
	/// Luminance-weighted map of an image.
	pub fn from_image(img: &image::RgbaImage, parallelism: Parallelism) -> Result<Self, BuildError> {
		Self::with_density(img, Density::Luminance, parallelism)
	}

	pub fn with_density(
		img: &image::RgbaImage,
		density: Density,
		parallelism: Parallelism
	) -> Result<Self, BuildError> {
		let source = DensitySource::from_density(img, density)?;
		Ok(Self::from_source(source, parallelism)?)
	}

	pub fn from_source(source: DensitySource, parallelism: Parallelism) -> Result<Self, PoolError> {
		Ok(Self::with_pool(source, parallelism.build_pool()?))
	}

	/// Map sharing an existing worker pool.
	pub(crate) fn with_pool(source: DensitySource, pool: Arc<rayon::ThreadPool>) -> Self {
		let source = Arc::new(source);
		let root = Cell::new(source.clone(), source.domain());
		Self { source, cells: vec![root], generation: 0, pool }
	}

	pub fn source(&self) -> &DensitySource {
		&self.source
	}

	pub fn domain(&self) -> Rect {
		self.source.domain()
	}

	pub fn cells(&self) -> &[Cell] {
		&self.cells
	}

	pub fn len(&self) -> usize {
		self.cells.len()
	}

	/// Never true; a map always holds at least its root cell.
	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}

	/// Number of completed `split` calls.
	pub fn generation(&self) -> u32 {
		self.generation
	}

	/// Advances one generation.
	///
	/// If any cell fails to split, the error is returned and the map is left
	/// exactly as it was.
	pub fn split(&mut self) -> Result<(), SplitError> {
		let cells = self.doubled()?;
		self.commit(cells);
		Ok(())
	}

	/// Computes the next generation without touching `self`.
	///
	/// The first half of the result holds the shrunk originals in their
	/// previous order, the second half the cell split off from each of them.
	pub(crate) fn doubled(&self) -> Result<Vec<Cell>, SplitError> {
		let count = self.cells.len();
		let doubled = count.checked_mul(2).ok_or(SplitError::TooManyCells)?;
		let mut kept = Vec::with_capacity(doubled);
		kept.extend(self.cells.iter().cloned());
		let fresh = self.pool.install(|| {
			kept.par_iter_mut()
				.map(Cell::split)
				.collect::<Result<Vec<_>, _>>()
		})?;
		kept.extend(fresh);
		Ok(kept)
	}

	pub(crate) fn commit(&mut self, cells: Vec<Cell>) {
		self.cells = cells;
		self.generation += 1;
		log::debug!("generation {}: {} cells", self.generation, self.cells.len());
	}

	/// Mean density of every cell, in cell order.
	pub fn means(&self) -> Result<Vec<u64>, DensityError> {
		self.pool.install(|| {
			self.cells.par_iter()
				.map(Cell::mean_density)
				.collect()
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn map(width: u32, height: u32, weights: &[u64]) -> SplitMap {
		let source = DensitySource::from_weights(width, height, weights).unwrap();
		SplitMap::from_source(source, Parallelism::new(4)).unwrap()
	}

	#[test]
	fn cell_count_doubles_each_generation() {
		let weights = (0..64).map(|i| i % 7).collect::<Vec<u64>>();
		let mut sm = map(8, 8, &weights);
		assert_eq!(sm.len(), 1);
		for g in 1..=6 {
			sm.split().unwrap();
			assert_eq!(sm.generation(), g);
			assert_eq!(sm.len(), 1 << g);
		}
	}

	#[test]
	fn first_half_keeps_shrunk_originals() {
		let mut sm = map(4, 2, &[1; 8]);
		sm.split().unwrap();
		let before = sm.cells().iter().map(Cell::region).collect::<Vec<_>>();
		sm.split().unwrap();
		let after = sm.cells();
		for (i, old) in before.iter().enumerate() {
			let kept = after[i].region();
			let fresh = after[i + before.len()].region();
			assert!(old.contains(&kept) && old.contains(&fresh));
			assert_eq!(kept.area() + fresh.area(), old.area());
		}
	}

	#[test]
	fn mass_is_conserved_across_generations() {
		let weights = (0..30).map(|i| (i * 13) % 11).collect::<Vec<u64>>();
		let mut sm = map(6, 5, &weights);
		let total: u64 = weights.iter().sum();
		for _ in 0..5 {
			sm.split().unwrap();
			let sum: u64 = sm.cells().iter().map(|c| c.mass().unwrap()).sum();
			assert_eq!(sum, total);
		}
	}

	#[test]
	fn failed_split_leaves_map_untouched() {
		let mut sm = map(2, 2, &[1; 4]);
		let bogus = DensitySource::from_weights(1, 1, &[1]).unwrap();
		sm.cells.push(Cell::new(Arc::new(bogus), Rect::from_size(2, 2)));
		let before = sm.cells().iter().map(Cell::region).collect::<Vec<_>>();
		assert!(sm.split().is_err());
		assert_eq!(sm.generation(), 0);
		assert_eq!(sm.cells().iter().map(Cell::region).collect::<Vec<_>>(), before);
	}
}
