use image::codecs::jpeg::JpegEncoder;
use image::error::ImageError;

use density_split::error::{BuildError, RenderError, SplitError};
use density_split::{ColorSplitMap, Gray16Image, Parallelism, SplitMap};

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

/// Parses an optional flag, falling back to `default` when absent.
fn parsed_arg<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str, default: &str) -> T {
	match matches.value_of(name).unwrap_or(default).parse() {
		Ok(n) => n,
		Err(_) => error_exit(&format!("Invalid value for {}", name), 2),
	}
}

#[derive(Clone, Copy, Debug)]
enum OutputFormat {
	Png,
	Jpeg { quality: u8 },
}

impl OutputFormat {
	fn extension(self) -> &'static str {
		match self {
			OutputFormat::Png => "png",
			OutputFormat::Jpeg { .. } => "jpg",
		}
	}
}

/// Anything that can go wrong once an image has been decoded.
#[derive(Debug)]
enum RunError {
	Build(BuildError),
	Split(SplitError),
	Render(RenderError),
	Save(ImageError),
}

impl From<BuildError> for RunError {
	fn from(e: BuildError) -> Self {
		RunError::Build(e)
	}
}

impl From<SplitError> for RunError {
	fn from(e: SplitError) -> Self {
		RunError::Split(e)
	}
}

impl From<RenderError> for RunError {
	fn from(e: RenderError) -> Self {
		RunError::Render(e)
	}
}

impl From<ImageError> for RunError {
	fn from(e: ImageError) -> Self {
		RunError::Save(e)
	}
}

/// Lists `path` itself, or every file below it if it is a directory.
fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
	if path.is_dir() {
		let mut entries = std::fs::read_dir(path)?
			.map(|e| e.map(|e| e.path()))
			.collect::<Result<Vec<_>, _>>()?;
		entries.sort();
		for entry in entries {
			collect_files(&entry, files)?;
		}
	} else {
		files.push(path.to_owned());
	}
	Ok(())
}

fn write_jpeg(
	path: &str,
	data: &[u8],
	size: (u32, u32),
	color: image::ColorType,
	quality: u8
) -> Result<(), ImageError> {
	let mut out = BufWriter::new(File::create(path)?);
	JpegEncoder::new_with_quality(&mut out, quality).encode(data, size.0, size.1, color)
}

fn save_gray(img: &Gray16Image, path: &str, format: OutputFormat) -> Result<(), ImageError> {
	match format {
		OutputFormat::Png => img.save_with_format(path, image::ImageFormat::Png),
		OutputFormat::Jpeg { quality } => {
			// JPEG has no 16-bit gray
			let gray = image::GrayImage::from_fn(img.width(), img.height(),
				|x, y| image::Luma([(img.get_pixel(x, y).0[0] >> 8) as u8]));
			write_jpeg(path, &gray, gray.dimensions(), image::ColorType::L8, quality)
		}
	}
}

fn save_rgba(img: &image::RgbaImage, path: &str, format: OutputFormat) -> Result<(), ImageError> {
	match format {
		OutputFormat::Png => img.save_with_format(path, image::ImageFormat::Png),
		OutputFormat::Jpeg { quality } => {
			let rgb = image::RgbImage::from_fn(img.width(), img.height(), |x, y| {
				let p = img.get_pixel(x, y).0;
				image::Rgb([p[0], p[1], p[2]])
			});
			write_jpeg(path, &rgb, rgb.dimensions(), image::ColorType::Rgb8, quality)
		}
	}
}

/// Saves generation 0, splits, saves generation 1, and so on.
///
/// With `save_all` off only the final generation is saved.
fn run_generations<M>(
	map: &mut M,
	generations: u32,
	save_all: bool,
	split: impl Fn(&mut M) -> Result<(), SplitError>,
	mut save: impl FnMut(&M, u32) -> Result<(), RunError>
) -> Result<(), RunError> {
	for g in 0..generations {
		if save_all {
			save(map, g)?;
		}
		split(map)?;
	}
	save(map, generations)
}

/// `clap`-based CLI for splitting images by density.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 10: other, potentially unknown error
///
/// Inputs that can't be decoded are skipped with a warning.
fn main() {
	env_logger::init();

	let clap_matches = clap::App::new("density_split")
		.version("0.1.0")
		.author("vkcz")
		.about("Splits images into cells of equal density and renders each cell as its mean.")
		.setting(clap::AppSettings::AllowNegativeNumbers)
		.arg_from_usage("-o, --output=[NAME] 'Base name of the output files; defaults to output'")
		.arg_from_usage("-e, --ext=[EXT] 'Output format, png or jpg; defaults to png'")
		.arg_from_usage("-q, --quality=[N] 'JPEG output quality (1-100); defaults to 90'")
		.arg_from_usage("-g, --generations=[N] 'Number of generations; defaults to 3'")
		.arg_from_usage("-s, --save-all=[BOOL] 'Save every generation, not just the last; defaults to true'")
		.arg_from_usage("-c, --cores=[N] 'Max number of worker threads; 0 or less uses all cores; defaults to 0'")
		.arg_from_usage("--color 'Split each RGBA channel separately instead of luminance'")
		.arg_from_usage("<INPUT> 'Image file, or directory to search for images'")
		.get_matches();

	let base_name = clap_matches.value_of("output").unwrap_or("output").to_string();
	let format = match clap_matches.value_of("ext").unwrap_or("png") {
		"png" => OutputFormat::Png,
		"jpg" | "jpeg" => {
			let quality: u8 = parsed_arg(&clap_matches, "quality", "90");
			if quality == 0 || quality > 100 {
				error_exit("JPEG quality must be between 1 and 100", 2)
			}
			OutputFormat::Jpeg { quality }
		},
		_ => error_exit("Output extension must be png or jpg", 2),
	};
	let generations: u32 = parsed_arg(&clap_matches, "generations", "3");
	let save_all: bool = parsed_arg(&clap_matches, "save-all", "true");
	let cores: i64 = parsed_arg(&clap_matches, "cores", "0");
	let parallelism = if cores <= 0 { Parallelism::default() } else { Parallelism::new(cores as usize) };
	let color = clap_matches.is_present("color");

	let mut files = Vec::new();
	// `INPUT` is required, so clap has already rejected its absence
	let root = Path::new(clap_matches.value_of("INPUT").unwrap_or("."));
	if let Err(e) = collect_files(root, &mut files) {
		error_exit(&format!("Could not read input: {}", e), 3)
	}

	let mut file_num = 0;
	for file in files {
		let source = match image::open(&file) {
			Ok(i) => i.into_rgba8(),
			Err(e) => {
				log::warn!("could not decode {}: {}", file.display(), e);
				continue;
			}
		};
		log::info!("splitting {} ({}x{})", file.display(), source.width(), source.height());
		let name = |g: u32| format!("{}-{:02}-{}.{}", base_name, g, file_num, format.extension());

		let result = if color {
			ColorSplitMap::from_image(&source, parallelism).map_err(RunError::from).and_then(|mut map| {
				let mut out = image::RgbaImage::new(source.width(), source.height());
				run_generations(&mut map, generations, save_all, ColorSplitMap::split, |map, g| {
					map.to_image(&mut out)?;
					Ok(save_rgba(&out, &name(g), format)?)
				})
			})
		} else {
			SplitMap::from_image(&source, parallelism).map_err(RunError::from).and_then(|mut map| {
				let mut out = Gray16Image::new(source.width(), source.height());
				run_generations(&mut map, generations, save_all, SplitMap::split, |map, g| {
					map.to_image(&mut out)?;
					Ok(save_gray(&out, &name(g), format)?)
				})
			})
		};

		match result {
			Ok(()) => (),
			Err(RunError::Save(e)) => error_exit(&format!("Could not save output: {}", e), 3),
			Err(RunError::Build(e)) => error_exit(&format!("{}", e), 10),
			Err(RunError::Split(e)) => error_exit(&format!("{}", e), 10),
			Err(RunError::Render(e)) => error_exit(&format!("{}", e), 10),
		}
		file_num += 1;
	}
}
