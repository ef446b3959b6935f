use rayon::prelude::*;

use super::error::{DensityError, RenderError};

/// 16-bit grayscale image buffer, the output of a single-channel map.
pub type Gray16Image = image::ImageBuffer<image::Luma<u16>, Vec<u16>>;

/// Run of one cell across a single buffer row.
#[derive(Clone, Copy, Debug)]
struct Span {
	start: u32,
	end: u32,
	value: u64,
}

fn check_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<(), RenderError> {
	if expected != actual {
		return Err(RenderError::DimensionMismatch { expected, actual });
	}
	Ok(())
}

impl super::SplitMap {
	/// Groups every non-empty cell's mean density by the rows it covers.
	fn row_spans(&self) -> Result<Vec<Vec<Span>>, DensityError> {
		let means = self.means()?;
		let mut rows = vec![Vec::new(); self.domain().height() as usize];
		for (cell, value) in self.cells.iter().zip(means) {
			let r = cell.region();
			if r.is_empty() {
				continue;
			}
			for y in r.min_y..r.max_y {
				rows[y as usize].push(Span { start: r.min_x, end: r.max_x, value });
			}
		}
		Ok(rows)
	}

	/// Writes each cell's mean into one slot of an interleaved sample buffer.
	///
	/// Rows are handed to workers as disjoint mutable slices, so no two
	/// workers can ever touch the same sample.
	fn paint<S, F>(&self, samples: &mut [S], channels: usize, slot: usize, to_sample: F) -> Result<(), RenderError>
	where
		S: Send,
		F: Fn(u64) -> S + Sync,
	{
		let spans = self.row_spans()?;
		let row_len = self.domain().width() as usize * channels;
		if row_len == 0 {
			return Ok(());
		}
		self.pool.install(|| {
			samples.par_chunks_mut(row_len)
				.zip(spans.par_iter())
				.for_each(|(row, spans)| {
					for span in spans {
						for x in span.start..span.end {
							row[x as usize * channels + slot] = to_sample(span.value);
						}
					}
				});
		});
		log::trace!("painted {} cells into slot {}", self.cells.len(), slot);
		Ok(())
	}

	/// Renders every cell as a block of its mean density.
	///
	/// Means above `u16::MAX` (only possible with custom weights) saturate.
	pub fn to_image(&self, img: &mut Gray16Image) -> Result<(), RenderError> {
		check_dimensions((self.domain().width(), self.domain().height()), img.dimensions())?;
		self.paint(&mut **img, 1, 0, |v| v.min(0xffff) as u16)
	}

	/// Renders into a single channel of an RGBA buffer, keeping the high
	/// byte of each 16-bit mean. The other channels are left alone.
	pub fn to_channel(&self, img: &mut image::RgbaImage, channel: usize) -> Result<(), RenderError> {
		if channel >= 4 {
			return Err(RenderError::InvalidChannel(channel));
		}
		check_dimensions((self.domain().width(), self.domain().height()), img.dimensions())?;
		self.paint(&mut **img, 4, channel, |v| (v.min(0xffff) >> 8) as u8)
	}
}

#[cfg(test)]
mod tests {
	use super::super::density::DensitySource;
	use super::super::parallel::Parallelism;
	use super::super::SplitMap;
	use super::*;

	fn stripes() -> SplitMap {
		let source = DensitySource::from_weights(4, 2, &[
			100, 100, 300, 300,
			100, 100, 300, 300,
		]).unwrap();
		SplitMap::from_source(source, Parallelism::new(2)).unwrap()
	}

	#[test]
	fn generation_zero_is_one_flat_block() {
		let sm = stripes();
		let mut img = Gray16Image::new(4, 2);
		sm.to_image(&mut img).unwrap();
		assert!(img.pixels().all(|p| p.0[0] == 200));
	}

	#[test]
	fn blocks_take_their_cell_mean() {
		let mut sm = stripes();
		sm.split().unwrap();
		let mut img = Gray16Image::new(4, 2);
		sm.to_image(&mut img).unwrap();
		// Total 1600; x=3 leaves 1000 | 600, x=2 leaves 400 | 1200
		let cut = sm.cells()[0].region().max_x;
		assert_eq!(cut, 3);
		for (x, _, p) in img.enumerate_pixels() {
			assert_eq!(p.0[0], if x < 3 { 1000 / 6 } else { 300 });
		}
	}

	#[test]
	fn rendering_twice_is_identical() {
		let mut sm = stripes();
		sm.split().unwrap();
		sm.split().unwrap();
		let mut first = Gray16Image::new(4, 2);
		let mut second = Gray16Image::from_pixel(4, 2, image::Luma([7]));
		sm.to_image(&mut first).unwrap();
		sm.to_image(&mut second).unwrap();
		assert_eq!(first.into_raw(), second.into_raw());
	}

	#[test]
	fn channel_render_touches_only_its_slot() {
		let sm = stripes();
		let mut img = image::RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 4]));
		sm.to_channel(&mut img, 2).unwrap();
		assert!(img.pixels().all(|p| p.0 == [1, 2, 0, 4]));
		assert_eq!(sm.to_channel(&mut img, 4), Err(RenderError::InvalidChannel(4)));
	}

	#[test]
	fn mismatched_buffers_are_rejected() {
		let sm = stripes();
		let mut img = Gray16Image::new(2, 4);
		assert_eq!(
			sm.to_image(&mut img),
			Err(RenderError::DimensionMismatch { expected: (4, 2), actual: (2, 4) })
		);
	}
}
