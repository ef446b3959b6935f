use rayon::prelude::*;

use super::density::{Density, DensitySource};
use super::error::{BuildError, RenderError, SplitError, TilingError};
use super::parallel::Parallelism;
use super::SplitMap;

/// Four independent split maps, one per RGBA channel, advanced in lockstep.
#[derive(Clone, Debug)]
pub struct ColorSplitMap {
	channels: [SplitMap; 4],
}

impl ColorSplitMap {
	/// Builds one map per channel density, all sharing a single worker pool.
	pub fn from_image(img: &image::RgbaImage, parallelism: Parallelism) -> Result<Self, BuildError> {
		let pool = parallelism.build_pool()?;
		let [r, g, b, a] = Density::CHANNELS;
		let map = |density: Density| -> Result<SplitMap, BuildError> {
			let source = DensitySource::from_density(img, density)?;
			Ok(SplitMap::with_pool(source, pool.clone()))
		};
		Ok(Self { channels: [map(r)?, map(g)?, map(b)?, map(a)?] })
	}

	/// The red, green, blue and alpha maps, in that order.
	pub fn channels(&self) -> &[SplitMap; 4] {
		&self.channels
	}

	pub fn generation(&self) -> u32 {
		self.channels[0].generation()
	}

	/// Advances every channel one generation.
	///
	/// Channels are split concurrently. Nothing is committed unless all four
	/// succeed, so the channels never drift apart.
	pub fn split(&mut self) -> Result<(), SplitError> {
		let pool = self.channels[0].pool.clone();
		let staged = pool.install(|| {
			self.channels.par_iter()
				.map(SplitMap::doubled)
				.collect::<Result<Vec<_>, _>>()
		})?;
		for (channel, cells) in self.channels.iter_mut().zip(staged) {
			channel.commit(cells);
		}
		Ok(())
	}

	/// Renders all four channels into their slots of an RGBA buffer.
	pub fn to_image(&self, img: &mut image::RgbaImage) -> Result<(), RenderError> {
		for (slot, channel) in self.channels.iter().enumerate() {
			channel.to_channel(img, slot)?;
		}
		Ok(())
	}

	pub fn check_tiling(&self) -> Result<(), TilingError> {
		self.channels.iter().try_for_each(SplitMap::check_tiling)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::super::cell::{Cell, Rect};
	use super::*;

	fn regions(csp: &ColorSplitMap) -> Vec<Vec<Rect>> {
		csp.channels().iter()
			.map(|c| c.cells().iter().map(Cell::region).collect())
			.collect()
	}

	#[test]
	fn failed_channel_leaves_every_channel_untouched() {
		let img = image::RgbaImage::from_fn(5, 3, |x, y| image::Rgba([(x * 40) as u8, (y * 80) as u8, 9, 255]));
		let mut csp = ColorSplitMap::from_image(&img, Parallelism::new(4)).unwrap();
		csp.split().unwrap();
		let bogus = DensitySource::from_weights(1, 1, &[1]).unwrap();
		csp.channels[2].cells.push(Cell::new(Arc::new(bogus), Rect::from_size(5, 3)));
		let before = regions(&csp);
		assert!(csp.split().is_err());
		assert_eq!(csp.generation(), 1);
		assert!(csp.channels().iter().all(|c| c.generation() == 1));
		assert_eq!(regions(&csp), before);
	}

	#[test]
	fn channels_advance_together() {
		let img = image::RgbaImage::from_fn(5, 3, |x, y| image::Rgba([(x * 40) as u8, (y * 80) as u8, 9, 255]));
		let mut csp = ColorSplitMap::from_image(&img, Parallelism::new(4)).unwrap();
		for g in 1..=4 {
			csp.split().unwrap();
			assert_eq!(csp.generation(), g);
			assert!(csp.channels().iter().all(|c| c.generation() == g && c.len() == 1 << g));
			csp.check_tiling().unwrap();
		}
	}

	#[test]
	fn channel_densities_are_independent() {
		let img = image::RgbaImage::from_fn(4, 4, |x, _| image::Rgba([if x < 2 { 255 } else { 0 }, 0, 0, 255]));
		let mut csp = ColorSplitMap::from_image(&img, Parallelism::new(2)).unwrap();
		csp.split().unwrap();
		let mut out = image::RgbaImage::new(4, 4);
		csp.to_image(&mut out).unwrap();
		// Half the red mass sits in column 0, so red splits at x=1 while the
		// uniform alpha channel splits at x=2
		assert_eq!(csp.channels()[0].cells()[0].region().max_x, 1);
		assert_eq!(csp.channels()[3].cells()[0].region().max_x, 2);
		assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
		assert_eq!(out.get_pixel(3, 3).0, [0x55, 0, 0, 255]);
	}
}
