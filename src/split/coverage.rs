use bitvec::vec::BitVec;

use super::cell::Rect;
use super::error::TilingError;

/// One bit per pixel of the domain, row-major.
type OwnershipBitVec = BitVec<bitvec::order::Msb0, u8>;

/// Checks that `regions` tile `domain`: every pixel claimed exactly once.
///
/// Empty regions claim nothing and are always fine.
pub fn check_tiling<'a, I>(domain: Rect, regions: I) -> Result<(), TilingError>
where
	I: IntoIterator<Item = &'a Rect>,
{
	let width = domain.width() as usize;
	let len = width * domain.height() as usize;
	let mut owned: OwnershipBitVec = std::iter::repeat(false).take(len).collect();
	let index = |x: u32, y: u32| (y - domain.min_y) as usize * width + (x - domain.min_x) as usize;

	for r in regions {
		if !domain.contains(r) {
			return Err(TilingError::OutOfDomain(*r));
		}
		for y in r.min_y..r.max_y {
			for x in r.min_x..r.max_x {
				let i = index(x, y);
				if owned[i] {
					return Err(TilingError::Overlap { x, y });
				}
				owned.set(i, true);
			}
		}
	}

	match (0..len).find(|&i| !owned[i]) {
		Some(i) => Err(TilingError::Gap {
			x: domain.min_x + (i % width) as u32,
			y: domain.min_y + (i / width) as u32,
		}),
		None => Ok(()),
	}
}

impl super::SplitMap {
	/// Verifies that the cells still tile the domain.
	pub fn check_tiling(&self) -> Result<(), TilingError> {
		let regions = self.cells.iter().map(|c| c.region()).collect::<Vec<_>>();
		check_tiling(self.domain(), &regions)
	}
}
