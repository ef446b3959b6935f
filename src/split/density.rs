use super::cell::Rect;
use super::error::DensityError;

pub type Color = image::Rgba<u8>;

/// Widens an 8-bit sample to 16 bits, so that `0xff` becomes `0xffff`.
fn widen(v: u8) -> u64 {
	v as u64 * 257
}

/// Named ways of turning a pixel into a density weight.
///
/// Every weight is in `0..=0xffff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Density {
	/// Average of the red, green and blue samples.
	Luminance,
	Red,
	Green,
	Blue,
	Alpha,
}

impl Density {
	/// The per-channel densities, in RGBA slot order.
	pub const CHANNELS: [Density; 4] = [Density::Red, Density::Green, Density::Blue, Density::Alpha];

	pub fn weight(self, px: &Color) -> u64 {
		match self {
			Density::Luminance => (widen(px.0[0]) + widen(px.0[1]) + widen(px.0[2])) / 3,
			Density::Red => widen(px.0[0]),
			Density::Green => widen(px.0[1]),
			Density::Blue => widen(px.0[2]),
			Density::Alpha => widen(px.0[3]),
		}
	}
}

/// Immutable summed-area table over a rectangular domain.
///
/// Internally this is a `(width + 1) x (height + 1)` grid where entry
/// `(x, y)` holds the total weight of every pixel strictly above and to the
/// left of `(x, y)`. The extra row and column are zero, so any rectangle's
/// mass is four lookups away.
#[derive(Clone, Debug)]
pub struct DensitySource {
	width: u32,
	height: u32,
	table: Box<[u64]>,
}

impl DensitySource {
	/// Builds a table from an image using an arbitrary extraction function.
	pub fn from_image<F>(img: &image::RgbaImage, weight: F) -> Result<Self, DensityError>
	where
		F: Fn(&Color) -> u64,
	{
		Self::build(img.width(), img.height(), img.pixels().map(weight))
	}

	/// Builds a table from an image using one of the named densities.
	pub fn from_density(img: &image::RgbaImage, density: Density) -> Result<Self, DensityError> {
		Self::from_image(img, |px| density.weight(px))
	}

	/// Builds a table from row-major weights.
	pub fn from_weights(width: u32, height: u32, weights: &[u64]) -> Result<Self, DensityError> {
		let expected = width as usize * height as usize;
		if weights.len() != expected {
			return Err(DensityError::SizeMismatch { expected, actual: weights.len() });
		}
		Self::build(width, height, weights.iter().copied())
	}

	fn build<I>(width: u32, height: u32, mut weights: I) -> Result<Self, DensityError>
	where
		I: Iterator<Item = u64>,
	{
		let stride = width as usize + 1;
		let mut table = vec![0u64; stride * (height as usize + 1)];
		for y in 0..height as usize {
			let mut row_sum = 0u64;
			for x in 0..width as usize {
				// Iterator length is checked by the callers
				let w = weights.next().unwrap_or(0);
				row_sum = row_sum.checked_add(w).ok_or(DensityError::Overflow)?;
				table[(y + 1) * stride + x + 1] = table[y * stride + x + 1]
					.checked_add(row_sum)
					.ok_or(DensityError::Overflow)?;
			}
		}
		Ok(Self { width, height, table: table.into_boxed_slice() })
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	/// The rectangle covering every pixel of the source.
	pub fn domain(&self) -> Rect {
		Rect::from_size(self.width, self.height)
	}

	/// Unchecked exclusive prefix lookup; `x <= width`, `y <= height`.
	#[inline]
	pub(crate) fn at(&self, x: u32, y: u32) -> u64 {
		self.table[y as usize * (self.width as usize + 1) + x as usize]
	}

	/// Total weight of all pixels with coordinates below `(x, y)` on both axes.
	pub fn corner(&self, x: u32, y: u32) -> Result<u64, DensityError> {
		if x > self.width || y > self.height {
			return Err(DensityError::OutOfBounds { x: x as i64, y: y as i64 });
		}
		Ok(self.at(x, y))
	}

	/// Total weight of all pixels up to and including `(x, y)`.
	///
	/// `-1` on either axis is the empty prefix and yields 0.
	pub fn value_at(&self, x: i64, y: i64) -> Result<u64, DensityError> {
		if x < -1 || y < -1 || x >= self.width as i64 || y >= self.height as i64 {
			return Err(DensityError::OutOfBounds { x, y });
		}
		Ok(self.at((x + 1) as u32, (y + 1) as u32))
	}

	/// Total weight strictly inside `rect`.
	pub fn area_sum(&self, rect: Rect) -> Result<u64, DensityError> {
		if !self.domain().contains(&rect) {
			return Err(DensityError::RegionOutOfBounds(rect));
		}
		if rect.is_empty() {
			return Ok(0);
		}
		let columns_to_bottom = self.at(rect.max_x, rect.max_y) - self.at(rect.min_x, rect.max_y);
		let columns_to_top = self.at(rect.max_x, rect.min_y) - self.at(rect.min_x, rect.min_y);
		Ok(columns_to_bottom - columns_to_top)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn grid() -> DensitySource {
		DensitySource::from_weights(3, 2, &[
			1, 2, 3,
			4, 5, 6,
		]).unwrap()
	}

	#[test]
	fn inclusive_values_follow_prefix_convention() {
		let ds = grid();
		assert_eq!(ds.value_at(-1, -1), Ok(0));
		assert_eq!(ds.value_at(-1, 1), Ok(0));
		assert_eq!(ds.value_at(0, 0), Ok(1));
		assert_eq!(ds.value_at(2, 0), Ok(6));
		assert_eq!(ds.value_at(1, 1), Ok(12));
		assert_eq!(ds.value_at(2, 1), Ok(21));
		assert_eq!(ds.value_at(3, 1), Err(DensityError::OutOfBounds { x: 3, y: 1 }));
		assert_eq!(ds.value_at(0, -2), Err(DensityError::OutOfBounds { x: 0, y: -2 }));
	}

	#[test]
	fn area_sums_match_direct_sums() {
		let ds = grid();
		assert_eq!(ds.area_sum(ds.domain()), Ok(21));
		assert_eq!(ds.area_sum(Rect::new(1, 0, 3, 2)), Ok(2 + 3 + 5 + 6));
		assert_eq!(ds.area_sum(Rect::new(1, 1, 2, 2)), Ok(5));
		assert_eq!(ds.area_sum(Rect::new(2, 0, 2, 2)), Ok(0));
		assert_eq!(
			ds.area_sum(Rect::new(0, 0, 4, 1)),
			Err(DensityError::RegionOutOfBounds(Rect::new(0, 0, 4, 1)))
		);
	}

	#[test]
	fn weight_count_must_match_domain() {
		assert_eq!(
			DensitySource::from_weights(2, 2, &[1, 2, 3]).unwrap_err(),
			DensityError::SizeMismatch { expected: 4, actual: 3 }
		);
	}

	#[test]
	fn overflow_is_reported() {
		assert_eq!(
			DensitySource::from_weights(2, 1, &[u64::MAX, 1]).unwrap_err(),
			DensityError::Overflow
		);
	}

	#[test]
	fn named_densities_widen_to_sixteen_bits() {
		let px = image::Rgba([0xff, 0x00, 0x80, 0x01]);
		assert_eq!(Density::Red.weight(&px), 0xffff);
		assert_eq!(Density::Green.weight(&px), 0);
		assert_eq!(Density::Blue.weight(&px), 0x8080);
		assert_eq!(Density::Alpha.weight(&px), 0x0101);
		assert_eq!(Density::Luminance.weight(&px), (0xffff + 0x8080) / 3);
	}

	#[test]
	fn images_build_with_custom_extraction() {
		let img = image::RgbaImage::from_fn(2, 2, |x, y| image::Rgba([(x + 2 * y) as u8, 0, 0, 0]));
		let ds = DensitySource::from_image(&img, |px| px.0[0] as u64).unwrap();
		assert_eq!(ds.area_sum(ds.domain()), Ok(0 + 1 + 2 + 3));
		assert_eq!(ds.corner(1, 2), Ok(0 + 2));
	}
}
