use std::fmt;

use super::cell::Rect;

/// Reason why a density source couldn't be built or queried.
#[derive(Debug, PartialEq, Eq)]
pub enum DensityError {
	/// The number of weights does not match `width * height`.
	SizeMismatch { expected: usize, actual: usize },
	/// The running sum of weights no longer fits in a `u64`.
	Overflow,
	/// A coordinate lies outside the cumulative table.
	OutOfBounds { x: i64, y: i64 },
	/// A rectangle is not contained in the density domain.
	RegionOutOfBounds(Rect),
}

/// Reason why a cell (or a whole map) couldn't be split.
#[derive(Debug, PartialEq, Eq)]
pub enum SplitError {
	/// The cell's region could not be looked up in its density source.
	Density(DensityError),
	/// The split would produce more cells than can be addressed.
	TooManyCells,
}

/// Reason why a split map couldn't be rendered to an image buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderError {
	/// The buffer's dimensions differ from the density domain.
	DimensionMismatch { expected: (u32, u32), actual: (u32, u32) },
	/// A cell's mean density could not be computed.
	Density(DensityError),
	/// The requested channel slot does not exist in an RGBA buffer.
	InvalidChannel(usize),
}

/// Reason why a split map failed its tiling check.
#[derive(Debug, PartialEq, Eq)]
pub enum TilingError {
	/// A cell reaches outside the domain.
	OutOfDomain(Rect),
	/// A pixel is claimed by more than one cell.
	Overlap { x: u32, y: u32 },
	/// A pixel is claimed by no cell at all.
	Gap { x: u32, y: u32 },
}

/// Reason why a worker pool couldn't be created.
#[derive(Debug)]
pub enum PoolError {
	/// `max_tasks` was zero.
	ZeroTasks,
	/// The thread pool itself refused to start.
	Build(rayon::ThreadPoolBuildError),
}

/// Reason why a split map couldn't be created.
#[derive(Debug)]
pub enum BuildError {
	/// The density source couldn't be built.
	Density(DensityError),
	/// The worker pool couldn't be started.
	Pool(PoolError),
}

impl From<DensityError> for BuildError {
	fn from(e: DensityError) -> Self {
		BuildError::Density(e)
	}
}

impl From<PoolError> for BuildError {
	fn from(e: PoolError) -> Self {
		BuildError::Pool(e)
	}
}

impl From<DensityError> for SplitError {
	fn from(e: DensityError) -> Self {
		SplitError::Density(e)
	}
}

impl From<DensityError> for RenderError {
	fn from(e: DensityError) -> Self {
		RenderError::Density(e)
	}
}

impl From<rayon::ThreadPoolBuildError> for PoolError {
	fn from(e: rayon::ThreadPoolBuildError) -> Self {
		PoolError::Build(e)
	}
}

impl fmt::Display for DensityError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DensityError::SizeMismatch { expected, actual } =>
				write!(f, "expected {} weights, got {}", expected, actual),
			DensityError::Overflow => write!(f, "cumulative density overflowed"),
			DensityError::OutOfBounds { x, y } =>
				write!(f, "coordinate ({}, {}) is outside the density table", x, y),
			DensityError::RegionOutOfBounds(r) =>
				write!(f, "region {} is outside the density domain", r),
		}
	}
}

impl fmt::Display for SplitError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SplitError::Density(e) => write!(f, "split failed: {}", e),
			SplitError::TooManyCells => write!(f, "too many cells to split again"),
		}
	}
}

impl fmt::Display for RenderError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RenderError::DimensionMismatch { expected, actual } => write!(f,
				"buffer is {}x{}, domain is {}x{}", actual.0, actual.1, expected.0, expected.1),
			RenderError::Density(e) => write!(f, "render failed: {}", e),
			RenderError::InvalidChannel(c) => write!(f, "no channel {} in an RGBA buffer", c),
		}
	}
}

impl fmt::Display for TilingError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TilingError::OutOfDomain(r) => write!(f, "cell {} leaves the domain", r),
			TilingError::Overlap { x, y } => write!(f, "pixel ({}, {}) is covered twice", x, y),
			TilingError::Gap { x, y } => write!(f, "pixel ({}, {}) is not covered", x, y),
		}
	}
}

impl fmt::Display for PoolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PoolError::ZeroTasks => write!(f, "at least one task must be allowed"),
			PoolError::Build(e) => write!(f, "could not start worker pool: {}", e),
		}
	}
}

impl fmt::Display for BuildError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BuildError::Density(e) => write!(f, "could not build density source: {}", e),
			BuildError::Pool(e) => write!(f, "{}", e),
		}
	}
}

impl std::error::Error for DensityError {}
impl std::error::Error for BuildError {}
impl std::error::Error for SplitError {}
impl std::error::Error for RenderError {}
impl std::error::Error for TilingError {}
impl std::error::Error for PoolError {}
