use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::density::DensitySource;
use super::error::{DensityError, SplitError};

/// Half-open, axis-aligned rectangle of pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
	pub min_x: u32,
	pub min_y: u32,
	pub max_x: u32,
	pub max_y: u32,
}

impl Rect {
	pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
		Self { min_x, min_y, max_x, max_y }
	}

	/// Rectangle anchored at the origin.
	pub fn from_size(width: u32, height: u32) -> Self {
		Self::new(0, 0, width, height)
	}

	pub fn width(&self) -> u32 {
		self.max_x.saturating_sub(self.min_x)
	}

	pub fn height(&self) -> u32 {
		self.max_y.saturating_sub(self.min_y)
	}

	pub fn area(&self) -> u64 {
		self.width() as u64 * self.height() as u64
	}

	pub fn is_empty(&self) -> bool {
		self.area() == 0
	}

	/// Whether `other` is well-formed and lies within `self`.
	pub fn contains(&self, other: &Rect) -> bool {
		other.min_x <= other.max_x && other.min_y <= other.max_y &&
			other.min_x >= self.min_x && other.max_x <= self.max_x &&
			other.min_y >= self.min_y && other.max_y <= self.max_y
	}
}

impl fmt::Display for Rect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}, {}) x [{}, {})", self.min_x, self.max_x, self.min_y, self.max_y)
	}
}

/// Axis along which a split coordinate is chosen.
///
/// `X` cuts the width with a vertical line, `Y` cuts the height with a
/// horizontal one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
	X,
	Y,
}

impl Axis {
	/// The longer axis of `rect`, preferring `X` when both are equal.
	pub fn longest(rect: &Rect) -> Axis {
		if rect.width() >= rect.height() { Axis::X } else { Axis::Y }
	}
}

/// Finds the coordinate on `axis` that best bisects the mass of `rect`.
///
/// The result `c` lies in `[min, max]` on that axis and minimizes
/// `|total - 2 * lead(c)|`, where `lead(c)` is the mass of the part of
/// `rect` below `c`. The search narrows a bracket by bisection until it is
/// one pixel wide, then compares both ends exactly.
///
/// On a tie the lower end wins, unless the extent is wider than one pixel
/// and the lower end is the rectangle's own edge: then the upper end is
/// taken, so a cell never hands its whole region to one side while it can
/// still be divided.
pub fn find_split(source: &DensitySource, rect: Rect, axis: Axis) -> Result<u32, DensityError> {
	if !source.domain().contains(&rect) {
		return Err(DensityError::RegionOutOfBounds(rect));
	}
	let ((start, end), (near, far)) = match axis {
		Axis::X => ((rect.min_x, rect.max_x), (rect.min_y, rect.max_y)),
		Axis::Y => ((rect.min_y, rect.max_y), (rect.min_x, rect.max_x)),
	};
	let (mut lo, mut hi) = (start, end);
	// Lookup with the split axis first
	let at = |along: u32, across: u32| match axis {
		Axis::X => source.at(along, across),
		Axis::Y => source.at(across, along),
	};

	let start_near = at(lo, near);
	let start_far = at(lo, far);
	let total = (at(hi, far) - start_far) - (at(hi, near) - start_near);
	let lead = |c: u32| (at(c, far) - start_far) - (at(c, near) - start_near);

	let mut c = lo + (hi - lo) / 2;
	while hi - lo > 1 {
		let l = lead(c);
		if l < total - l {
			lo = c;
		} else {
			hi = c;
		}
		c = lo + (hi - lo) / 2;
	}

	let miss = |c: u32| (total as i128 - 2 * lead(c) as i128).abs();
	let on_edge = |c: u32| end - start > 1 && (c == start || c == end);
	Ok(match miss(lo).cmp(&miss(hi)) {
		Ordering::Less => lo,
		Ordering::Greater => hi,
		Ordering::Equal if on_edge(lo) => hi,
		Ordering::Equal => lo,
	})
}

/// One rectangle of a split map, tied to the density it partitions.
#[derive(Clone, Debug)]
pub struct Cell {
	source: Arc<DensitySource>,
	region: Rect,
}

impl Cell {
	pub fn new(source: Arc<DensitySource>, region: Rect) -> Self {
		Self { source, region }
	}

	pub fn region(&self) -> Rect {
		self.region
	}

	pub fn source(&self) -> &Arc<DensitySource> {
		&self.source
	}

	pub fn mass(&self) -> Result<u64, DensityError> {
		self.source.area_sum(self.region)
	}

	/// Mean weight per pixel, or 0 for an empty region.
	pub fn mean_density(&self) -> Result<u64, DensityError> {
		let mass = self.mass()?;
		let area = self.region.area();
		Ok(if area == 0 { 0 } else { mass / area })
	}

	/// Splits the cell across its longest axis.
	///
	/// `self` keeps the part below the split coordinate and the returned cell
	/// covers the rest. Regions too thin to divide stay stuck: a 1-pixel
	/// extent gives an empty half here and hands the whole extent (and mass)
	/// to the new cell, and an empty extent stays empty on both sides.
	pub fn split(&mut self) -> Result<Cell, SplitError> {
		let axis = Axis::longest(&self.region);
		let at = find_split(&self.source, self.region, axis)?;
		let mut child = self.clone();
		match axis {
			Axis::X => {
				self.region.max_x = at;
				child.region.min_x = at;
			}
			Axis::Y => {
				self.region.max_y = at;
				child.region.min_y = at;
			}
		}
		Ok(child)
	}
}
