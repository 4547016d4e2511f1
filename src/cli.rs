// Command-line front-end. Every subcommand fills in one panel form and hands
// it to the studio; results are written only when the call succeeds.
//
//   imagestudio generate --prompt "a lighthouse at dusk" --style cinematic --aspect-ratio 16:9
//   imagestudio upscale --image photo.png --mode creative --prompt "sharp film photo"
//   imagestudio inpaint --image room.png --paint strokes.png --prompt "a green armchair"
//   imagestudio outpaint --image beach.jpg --direction all --prompt "more of the shoreline"
//   imagestudio mask --image room.png --shape ellipse:40,40,120,80 -o mask.png

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::{
    config::Config,
    error::{Result, StudioError},
    imaging,
    logger,
    mask::{PaintMode, Shape, DEFAULT_THRESHOLD},
    models::{
        AspectRatio, GenerateModel, GenerateRequest, LightSource, OutpaintDirection,
        OutpaintRequest, ReplaceBackgroundRequest, SearchRecolorRequest, SearchReplaceRequest,
        StylePreset, UpscaleMode, UpscaleRequest,
    },
    stability::{GenerateClient, StabilityClient},
    studio::{EraseForm, InpaintForm, MaskSource, PanelAction, PanelOutput, Studio},
};

#[derive(Parser, Debug)]
#[command(
    name = "imagestudio",
    version,
    about = "AI Image Studio: generate, upscale and edit images with the Stability AI API",
    long_about = "Generate, upscale and edit images with the Stability AI stable-image API.\n\
                  The API key is read from STABILITY_API_KEY (a .env file is honoured).\n\
                  The mask and canvas commands work offline."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Output file. Defaults to the feature's usual file name inside --output-dir.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for results (overrides STUDIO_OUTPUT_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Debug logging with module and file locations.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the available features.
    Home,

    /// Generate an image from a text prompt.
    Generate {
        #[arg(short, long)]
        prompt: String,
        /// What to avoid in the image.
        #[arg(short, long)]
        negative_prompt: Option<String>,
        /// Style preset; "enhance" lets the model choose.
        #[arg(long, default_value = "enhance")]
        style: StylePreset,
        #[arg(short, long, default_value = "1:1")]
        aspect_ratio: AspectRatio,
        /// Same seed and prompt give the same image.
        #[arg(long)]
        seed: Option<u64>,
        /// ultra, core or sd3.
        #[arg(long, default_value = "ultra")]
        model: GenerateModel,
    },

    /// Increase resolution (creative, conservative or fast).
    Upscale {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long, default_value = "creative")]
        mode: UpscaleMode,
        /// Required for creative and conservative.
        #[arg(short, long, default_value = "")]
        prompt: String,
        #[arg(short, long)]
        negative_prompt: Option<String>,
        #[arg(long)]
        creativity: Option<f32>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Remove the background, leaving a transparent PNG.
    RemoveBackground {
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Regenerate the masked part of an image.
    Inpaint {
        #[arg(short, long)]
        image: PathBuf,
        /// What should appear in the masked areas.
        #[arg(short, long)]
        prompt: String,
        #[command(flatten)]
        mask: MaskArgs,
        #[arg(short, long)]
        negative_prompt: Option<String>,
        #[arg(long)]
        grow_mask: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Extend the canvas with generated content.
    Outpaint {
        #[arg(short, long)]
        image: PathBuf,
        /// What should appear in the extended areas.
        #[arg(short, long)]
        prompt: String,
        /// Preset: up, down, left, right or all (32 px per side).
        #[arg(short, long)]
        direction: Option<OutpaintDirection>,
        #[arg(long, default_value_t = 0)]
        left: u32,
        #[arg(long, default_value_t = 0)]
        right: u32,
        #[arg(long, default_value_t = 0)]
        up: u32,
        #[arg(long, default_value_t = 0)]
        down: u32,
        #[arg(long)]
        creativity: Option<f32>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replace the background behind the subject, optionally relighting it.
    ReplaceBackground {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long)]
        background_prompt: String,
        #[arg(short, long)]
        foreground_prompt: Option<String>,
        #[arg(short, long)]
        negative_prompt: Option<String>,
        /// How strictly to keep the subject, 0 to 1.
        #[arg(long)]
        preserve_subject: Option<f32>,
        /// Use replace-background-and-relight (asynchronous).
        #[arg(long)]
        relight: bool,
        /// left, right, above or below.
        #[arg(long)]
        light_direction: Option<LightSource>,
        #[arg(long)]
        light_strength: Option<f32>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Find an object by description and replace it.
    SearchReplace {
        #[arg(short, long)]
        image: PathBuf,
        /// What to look for.
        #[arg(short, long)]
        search: String,
        /// What to put in its place.
        #[arg(short, long)]
        prompt: String,
        #[arg(short, long)]
        negative_prompt: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Find an object by description and change its colour.
    SearchRecolor {
        #[arg(short, long)]
        image: PathBuf,
        /// What to recolor.
        #[arg(short, long)]
        select: String,
        /// The new colour, e.g. "bright red leather".
        #[arg(short, long)]
        prompt: String,
        #[arg(short, long)]
        negative_prompt: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Remove the masked content.
    Erase {
        #[arg(short, long)]
        image: PathBuf,
        #[command(flatten)]
        mask: MaskArgs,
        #[arg(long)]
        grow_mask: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Build a mask locally and save it.
    Mask {
        #[arg(short, long)]
        image: PathBuf,
        #[command(flatten)]
        mask: MaskArgs,
    },

    /// Save a display-sized copy of an image to paint a mask on.
    Canvas {
        #[arg(short, long)]
        image: PathBuf,
    },
}

/// Exactly one mask source must be given.
#[derive(Args, Debug, Clone)]
pub struct MaskArgs {
    /// Ready-made mask image (white = edit).
    #[arg(long, value_name = "FILE")]
    pub mask: Option<PathBuf>,
    /// Canvas with painted strokes.
    #[arg(long, value_name = "FILE")]
    pub paint: Option<PathBuf>,
    /// Transparent stroke layer; any alpha counts as paint.
    #[arg(long, value_name = "FILE")]
    pub alpha: Option<PathBuf>,
    /// Painted copy of the image; changed pixels become the mask.
    #[arg(long, value_name = "FILE")]
    pub diff: Option<PathBuf>,
    /// rect:x,y,w,h, ellipse:x,y,w,h or border:n (repeatable).
    #[arg(long, value_name = "SHAPE")]
    pub shape: Vec<Shape>,
    /// bright (white strokes) or dark (black strokes).
    #[arg(long, default_value = "bright")]
    pub paint_mode: PaintMode,
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: u8,
}

impl MaskArgs {
    pub fn to_source(&self) -> Result<MaskSource> {
        let given = [
            self.mask.is_some(),
            self.paint.is_some(),
            self.alpha.is_some(),
            self.diff.is_some(),
            !self.shape.is_empty(),
        ]
        .iter()
        .filter(|given| **given)
        .count();
        if given != 1 {
            return Err(StudioError::validation(
                "give exactly one of --mask, --paint, --alpha, --diff or --shape",
            ));
        }

        if let Some(path) = &self.mask {
            return Ok(MaskSource::Image {
                mask: open_image(path)?,
                threshold: self.threshold,
            });
        }
        if let Some(path) = &self.paint {
            return Ok(MaskSource::Paint {
                canvas: open_image(path)?,
                mode: self.paint_mode,
                threshold: self.threshold,
            });
        }
        if let Some(path) = &self.alpha {
            return Ok(MaskSource::Alpha {
                canvas: open_image(path)?,
            });
        }
        if let Some(path) = &self.diff {
            return Ok(MaskSource::Diff {
                painted: open_image(path)?,
                threshold: self.threshold,
            });
        }
        Ok(MaskSource::Shapes(self.shape.clone()))
    }
}

fn open_image(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).map_err(|e| {
        StudioError::validation(format!("cannot open {}: {}", path.display(), e))
    })
}

impl Command {
    fn into_action(self) -> Result<Option<PanelAction>> {
        let action = match self {
            Command::Home => return Ok(None),
            Command::Generate {
                prompt,
                negative_prompt,
                style,
                aspect_ratio,
                seed,
                model,
            } => PanelAction::Generate(GenerateRequest {
                prompt,
                negative_prompt,
                style,
                aspect_ratio,
                seed,
                model,
            }),
            Command::Upscale {
                image,
                mode,
                prompt,
                negative_prompt,
                creativity,
                seed,
            } => {
                let mut request =
                    UpscaleRequest::new(imaging::load_image_file(image)?, mode, prompt);
                request.negative_prompt = negative_prompt;
                request.creativity = creativity;
                request.seed = seed;
                PanelAction::Upscale(request)
            }
            Command::RemoveBackground { image } => {
                PanelAction::RemoveBackground(imaging::load_image_file(image)?)
            }
            Command::Inpaint {
                image,
                prompt,
                mask,
                negative_prompt,
                grow_mask,
                seed,
            } => PanelAction::Inpaint(InpaintForm {
                image: imaging::load_image_file(image)?,
                mask: mask.to_source()?,
                prompt,
                negative_prompt,
                grow_mask,
                seed,
            }),
            Command::Outpaint {
                image,
                prompt,
                direction,
                left,
                right,
                up,
                down,
                creativity,
                seed,
            } => {
                let request = OutpaintRequest::new(imaging::load_image_file(image)?, prompt);
                let mut request = match direction {
                    Some(direction) => request.with_direction(direction),
                    None => request.with_extents(left, right, up, down),
                };
                request.creativity = creativity;
                request.seed = seed;
                PanelAction::Outpaint(request)
            }
            Command::ReplaceBackground {
                image,
                background_prompt,
                foreground_prompt,
                negative_prompt,
                preserve_subject,
                relight,
                light_direction,
                light_strength,
                seed,
            } => {
                let mut request = ReplaceBackgroundRequest::new(
                    imaging::load_image_file(image)?,
                    background_prompt,
                );
                request.foreground_prompt = foreground_prompt;
                request.negative_prompt = negative_prompt;
                request.preserve_original_subject = preserve_subject;
                request.relight = relight;
                request.light_source_direction = light_direction;
                request.light_source_strength = light_strength;
                request.seed = seed;
                PanelAction::ReplaceBackground(request)
            }
            Command::SearchReplace {
                image,
                search,
                prompt,
                negative_prompt,
                seed,
            } => {
                let mut request =
                    SearchReplaceRequest::new(imaging::load_image_file(image)?, search, prompt);
                request.negative_prompt = negative_prompt;
                request.seed = seed;
                PanelAction::SearchReplace(request)
            }
            Command::SearchRecolor {
                image,
                select,
                prompt,
                negative_prompt,
                seed,
            } => {
                let mut request =
                    SearchRecolorRequest::new(imaging::load_image_file(image)?, select, prompt);
                request.negative_prompt = negative_prompt;
                request.seed = seed;
                PanelAction::SearchRecolor(request)
            }
            Command::Erase {
                image,
                mask,
                grow_mask,
                seed,
            } => PanelAction::Erase(EraseForm {
                image: imaging::load_image_file(image)?,
                mask: mask.to_source()?,
                grow_mask,
                seed,
            }),
            Command::Mask { image, mask } => PanelAction::Mask {
                image: imaging::load_image_file(image)?,
                source: mask.to_source()?,
            },
            Command::Canvas { image } => PanelAction::Canvas(imaging::load_image_file(image)?),
        };
        Ok(Some(action))
    }
}

fn print_home() {
    println!("🎨 AI Image Studio");
    println!("Your personal AI-powered image creation and editing suite\n");
    for (page, description) in Studio::overview() {
        println!("  {:<12} {}", page.title(), description);
    }
    println!("\nGeneration models:");
    for (id, name, note) in GenerateClient::supported_models() {
        println!("  {:<6} {} ({})", id, name, note);
    }
    println!("\nStyle presets:");
    let styles: Vec<&str> = StylePreset::ALL.iter().map(|s| s.as_str()).collect();
    println!("  {}", styles.join(", "));
}

/// Where a result goes: `--output` wins, otherwise the panel's file name in
/// the output directory.
pub fn output_path(output: Option<&Path>, output_dir: &Path, result: &PanelOutput) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => output_dir.join(result.file_name()),
    }
}

fn save(path: &Path, result: &PanelOutput) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &result.bytes)?;
    Ok(())
}

/// Runs one command against an already loaded configuration. `--output-dir`
/// overrides the configured directory.
pub async fn run(args: CliArgs, mut config: Config) -> ExitCode {
    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(dir.clone());
    }
    logger::log_config_info(&config);

    let action = match args.command.into_action() {
        Ok(Some(action)) => action,
        Ok(None) => {
            print_home();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = if action.needs_api() {
        let built = config
            .stability()
            .and_then(|stability| StabilityClient::new(stability.clone()));
        match built {
            Ok(client) => Some(client),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let mut studio = Studio::new(client);
    let result = match studio.dispatch(action).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let path = output_path(args.output.as_deref(), &config.output_dir, result);
    if let Err(e) = save(&path, result) {
        eprintln!("error: could not write {}: {}", path.display(), e);
        return ExitCode::FAILURE;
    }

    for line in &result.summary {
        println!("{}", line);
    }
    println!("📥 Saved {}", path.display());
    ExitCode::SUCCESS
}
