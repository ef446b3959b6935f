pub mod split;

pub use split::*;
pub use split::cell::{Axis, Cell, Rect, find_split};
pub use split::color::ColorSplitMap;
pub use split::density::{Density, DensitySource};
pub use split::parallel::Parallelism;
pub use split::render::Gray16Image;

/// Single-channel (luminance) map of an image.
pub fn new_mono_partition(
	img: &image::RgbaImage,
	parallelism: Parallelism
) -> Result<SplitMap, error::BuildError> {
	SplitMap::from_image(img, parallelism)
}

/// Four-channel (RGBA) map of an image.
pub fn new_color_partition(
	img: &image::RgbaImage,
	parallelism: Parallelism
) -> Result<ColorSplitMap, error::BuildError> {
	ColorSplitMap::from_image(img, parallelism)
}
