use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{error, info, warn};

use gba_assets::{
    artifact::{font_artifacts, image_artifacts},
    config::CompilerConfig,
    error::{exit_code, AssetError},
    glyph::FontAsset,
    helpers::is_identifier,
    image::ImageAsset,
    persist::{save_json, save_png, write_artifacts},
    quantize::QuantizerConfig,
    raster::Raster,
};

const DEFAULT_FONT_DIR: &str = "out";

fn parse_name(s: &str) -> Result<String, String> {
    if is_identifier(s) {
        Ok(s.to_string())
    } else {
        Err(format!("'{}' is not a valid C identifier", s))
    }
}

/// Compiles P3 images and font sheets into indexed-color C data
#[derive(Parser, Debug)]
#[command(name = "gba-assets", version, about)]
struct Cli {
    /// Configuration file (default: the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct QuantizerArgs {
    /// Maximum number of distinct colors
    #[arg(long)]
    capacity: Option<usize>,

    /// Let the first color take index 0
    #[arg(long)]
    no_reserve_zero: bool,
}

impl QuantizerArgs {
    fn apply(&self, config: &mut QuantizerConfig) -> Result<()> {
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if self.no_reserve_zero {
            config.reserve_zero = false;
            config.black_is_background = false;
        }
        config.validate().map_err(|e| AssetError::usage(&e))?;
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile an image read from stdin
    Image {
        /// Symbol prefix for the generated data
        #[arg(value_parser = parse_name)]
        name: String,

        /// Write NAME.h and NAME.c here instead of printing them
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Also save the compiled record as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Also save an indexed PNG preview
        #[arg(long)]
        png: Option<PathBuf>,

        #[command(flatten)]
        quantizer: QuantizerArgs,
    },

    /// Compile a font sheet read from stdin
    Font {
        #[arg(value_parser = parse_name, default_value = "font")]
        name: String,

        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[arg(long)]
        json: Option<PathBuf>,

        /// Guide-row index marking glyph boundaries
        #[arg(long)]
        marker: Option<u8>,

        #[command(flatten)]
        quantizer: QuantizerArgs,
    },

    /// Print one glyph of the font sheet read from stdin as a P3 image
    Glyph { ch: char },

    /// Compile every image matching a glob pattern
    Batch {
        pattern: String,

        #[arg(long)]
        out_dir: PathBuf,

        #[command(flatten)]
        quantizer: QuantizerArgs,
    },
}

/// Exit code for a failed parse: help and version are not failures.
fn parse_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn print(out: &mut impl Write, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn compile_image(
    name: &str,
    raster: &Raster,
    config: QuantizerConfig,
    out_dir: Option<&Path>,
    out: &mut impl Write,
) -> Result<ImageAsset> {
    let asset = ImageAsset::compile(name, raster, config)?;
    let artifacts = image_artifacts(&asset);
    match out_dir {
        Some(dir) => {
            write_artifacts(dir, name, &artifacts)?;
        }
        None => print(out, &artifacts.combined())?,
    }
    Ok(asset)
}

fn run_batch(pattern: &str, out_dir: &Path, config: QuantizerConfig) -> Result<usize> {
    let mut count = 0;
    let paths = glob::glob(pattern)
        .context("glob pattern")
        .map_err(|e| AssetError::usage(&e))?;
    for entry in paths {
        let path = entry?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| is_identifier(s))
            .with_context(|| format!("{} does not name a C identifier", path.display()))?
            .to_string();
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let raster = Raster::decode(&text).with_context(|| format!("in {}", path.display()))?;
        let asset = compile_image(&name, &raster, config, Some(out_dir), &mut io::sink())
            .with_context(|| format!("in {}", path.display()))?;
        save_json(&out_dir.join(format!("{}.json", name)), &asset)?;
        count += 1;
    }
    if count == 0 {
        warn!("No files match {}", pattern);
    }
    info!("Compiled {} images", count);
    Ok(count)
}

fn run(cli: Cli, input: impl Read, out: &mut impl Write) -> Result<()> {
    let mut config = CompilerConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Image {
            name,
            out_dir,
            json,
            png,
            quantizer,
        } => {
            quantizer.apply(&mut config.image)?;
            let raster = Raster::read_from(input)?;
            let out_dir = out_dir.or(config.out_dir);
            let asset = compile_image(&name, &raster, config.image, out_dir.as_deref(), out)?;
            if let Some(path) = json {
                save_json(&path, &asset)?;
            }
            if let Some(path) = png {
                save_png(&path, &asset.image, &asset.palette)?;
            }
        }
        Command::Font {
            name,
            out_dir,
            json,
            marker,
            quantizer,
        } => {
            quantizer.apply(&mut config.font.quantizer)?;
            if let Some(marker) = marker {
                config.font.marker_index = marker;
            }
            let raster = Raster::read_from(input)?;
            let font = FontAsset::compile(&name, &raster, &config.font)?;
            let out_dir = out_dir
                .or(config.out_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_DIR));
            write_artifacts(&out_dir, &name, &font_artifacts(&font))?;
            if let Some(path) = json {
                save_json(&path, &font)?;
            }
        }
        Command::Glyph { ch } => {
            let raster = Raster::read_from(input)?;
            let font = FontAsset::compile("font", &raster, &config.font)?;
            let glyph = font
                .glyph_raster(ch)
                .ok_or_else(|| AssetError::malformed("glyph", format!("{:?} is not printable", ch)))?;
            print(out, &glyph.encode())?;
        }
        Command::Batch {
            pattern,
            out_dir,
            quantizer,
        } => {
            quantizer.apply(&mut config.image)?;
            run_batch(&pattern, &out_dir, config.image)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_exit_code(&e));
        }
    };

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    match run(cli, io::stdin().lock(), &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_GREEN: &str = "P3\n2 1\n255\n255 0 0 0 255 0\n";

    struct Scratch {
        dir: PathBuf,
        config: PathBuf,
    }

    // Fresh directory with a default config file, so the platform config is
    // never read
    fn scratch(name: &str) -> Scratch {
        let dir = std::env::temp_dir().join(format!("gba_assets_cli_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let config = dir.join("config.json");
        CompilerConfig::default().save(&config).unwrap();
        Scratch { dir, config }
    }

    impl Scratch {
        fn cli(&self, args: &[&str]) -> Cli {
            let config = self.config.to_str().unwrap();
            let mut argv = vec!["gba-assets", "--config", config];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap()
        }

        fn exec(&self, args: &[&str], input: &str) -> (Result<()>, String) {
            let mut out = vec![];
            let result = run(self.cli(args), input.as_bytes(), &mut out);
            (result, String::from_utf8(out).unwrap())
        }
    }

    // Guide row of markers around 95 one-pixel glyphs, ink on the glyph row
    fn font_sheet(marker: [u8; 3]) -> String {
        let width = 2 * 95 + 1;
        let guide = (0..width)
            .map(|x| if x % 2 == 0 { marker } else { [0, 0, 0] })
            .collect::<Vec<_>>();
        let ink = (0..width)
            .map(|x| if x % 2 == 1 { [255, 0, 0] } else { [0, 0, 0] })
            .collect::<Vec<_>>();
        let pixels = guide.into_iter().chain(ink).collect();
        Raster::new(width, 2, pixels).encode()
    }

    #[test]
    fn parse_failures_exit_with_usage_code() {
        let missing = Cli::try_parse_from(["gba-assets", "image"]).unwrap_err();
        assert_eq!(parse_exit_code(&missing), 1);
        let bad_name = Cli::try_parse_from(["gba-assets", "image", "9lives"]).unwrap_err();
        assert_eq!(parse_exit_code(&bad_name), 1);
        let bad_number =
            Cli::try_parse_from(["gba-assets", "image", "sky", "--capacity", "lots"]).unwrap_err();
        assert_eq!(parse_exit_code(&bad_number), 1);

        let help = Cli::try_parse_from(["gba-assets", "--help"]).unwrap_err();
        assert_eq!(parse_exit_code(&help), 0);
        let version = Cli::try_parse_from(["gba-assets", "--version"]).unwrap_err();
        assert_eq!(parse_exit_code(&version), 0);
    }

    #[test]
    fn font_name_defaults() {
        let cli = Cli::try_parse_from(["gba-assets", "font"]).unwrap();
        assert!(matches!(cli.command, Command::Font { ref name, .. } if name == "font"));
    }

    #[test]
    fn image_prints_both_artifacts_without_out_dir() {
        let s = scratch("stdout");
        let (result, out) = s.exec(&["image", "sky"], RED_GREEN);
        result.unwrap();
        assert!(out.contains("extern const uint8_t sky_indexed[2];"));
        assert!(out.contains("const uint8_t sky_indexed[2] __attribute__((aligned(4))) = {\n  0x01, 0x02,\n};"));
    }

    #[test]
    fn out_dir_writes_files_and_prints_nothing() {
        let s = scratch("out_dir");
        let out_dir = s.dir.join("out");
        let json = s.dir.join("sky.json");
        let (result, out) = s.exec(
            &[
                "image",
                "sky",
                "--out-dir",
                out_dir.to_str().unwrap(),
                "--json",
                json.to_str().unwrap(),
            ],
            RED_GREEN,
        );
        result.unwrap();
        assert!(out.is_empty());
        assert!(out_dir.join("sky.h").exists());
        assert!(fs::read_to_string(out_dir.join("sky.c")).unwrap().contains("sky_palette_size = 3;"));
        let asset: ImageAsset = gba_assets::persist::load_json(&json).unwrap();
        assert_eq!(asset.image.pixels, vec![1, 2]);
    }

    #[test]
    fn quantizer_flags_override_config() {
        let s = scratch("overrides");
        let (result, out) = s.exec(&["image", "sky", "--no-reserve-zero"], RED_GREEN);
        result.unwrap();
        assert!(out.contains("  0x00, 0x01,\n"));

        let (result, _) = s.exec(&["image", "sky", "--capacity", "1"], RED_GREEN);
        assert_eq!(exit_code(&result.unwrap_err()), 4);

        let mut config = QuantizerConfig::image();
        let args = QuantizerArgs {
            capacity: Some(7),
            no_reserve_zero: false,
        };
        args.apply(&mut config).unwrap();
        assert_eq!(config.capacity, 7);
    }

    #[test]
    fn out_of_range_capacity_is_a_usage_error() {
        let s = scratch("capacity");
        let (result, out) = s.exec(&["image", "sky", "--capacity", "300"], RED_GREEN);
        assert_eq!(exit_code(&result.unwrap_err()), 1);
        assert!(out.is_empty());
        let (result, _) = s.exec(&["image", "sky", "--capacity", "0"], RED_GREEN);
        assert_eq!(exit_code(&result.unwrap_err()), 1);
    }

    #[test]
    fn marker_flag_selects_the_boundary_index() {
        let s = scratch("marker");
        let out_dir = s.dir.join("fonts");
        let out_dir = out_dir.to_str().unwrap();
        // White markers come first, so they take index 1
        let sheet = font_sheet([255, 255, 255]);
        let (result, _) = s.exec(&["font", "--out-dir", out_dir], &sheet);
        result.unwrap();
        let c = fs::read_to_string(Path::new(out_dir).join("font.c")).unwrap();
        assert!(c.contains("const int font_height = 1;"));
        assert!(c.contains("  1, 1, 1, 1, 1, 1, 1, 1,"));

        // With index 2 as marker nothing in the guide row matches
        let (result, _) = s.exec(&["font", "small", "--out-dir", out_dir, "--marker", "2"], &sheet);
        assert_eq!(exit_code(&result.unwrap_err()), 5);
        assert!(!Path::new(out_dir).join("small.c").exists());
    }

    #[test]
    fn glyph_prints_a_p3_image() {
        let s = scratch("glyph");
        let (result, out) = s.exec(&["glyph", "A"], &font_sheet([255, 255, 255]));
        result.unwrap();
        assert_eq!(out, "P3\n1 1\n255\n255 0 0\n");
    }

    #[test]
    fn batch_compiles_every_match() {
        let s = scratch("batch");
        let src = s.dir.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("one.ppm"), RED_GREEN).unwrap();
        fs::write(src.join("two.ppm"), "P3\n1 1\n255\n0 0 255\n").unwrap();
        fs::write(src.join("notes.txt"), "ignored").unwrap();
        let out_dir = s.dir.join("out");
        let pattern = format!("{}/*.ppm", src.display());

        let (result, out) = s.exec(&["batch", &pattern, "--out-dir", out_dir.to_str().unwrap()], "");
        result.unwrap();
        assert!(out.is_empty());
        for name in ["one", "two"] {
            assert!(out_dir.join(format!("{name}.h")).exists());
            assert!(out_dir.join(format!("{name}.c")).exists());
            assert!(out_dir.join(format!("{name}.json")).exists());
        }
        assert!(!out_dir.join("notes.h").exists());
        assert_eq!(run_batch(&pattern, &out_dir, QuantizerConfig::image()).unwrap(), 2);
    }

    #[test]
    fn batch_stops_at_a_bad_file() {
        let s = scratch("batch_bad");
        let src = s.dir.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("bad.ppm"), "P6\n1 1\n255\n0 0 0\n").unwrap();
        let pattern = format!("{}/*.ppm", src.display());
        let err = run_batch(&pattern, &s.dir.join("out"), QuantizerConfig::image()).unwrap_err();
        assert_eq!(exit_code(&err), 2);
        let err = run_batch("[", &s.dir.join("out"), QuantizerConfig::image()).unwrap_err();
        assert_eq!(exit_code(&err), 1);
    }
}
