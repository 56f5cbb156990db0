/// imgmark command-line entry point for native builds
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use anyhow::{Context, Result, bail};
    use clap::{Args, Parser, Subcommand};
    use imgmark::gallery::{AnnotationBadges, AnnotationFilter, paginate, recent};
    use imgmark::store::{
        AnnotationId, AnnotationStore, FileBackend, ImageCatalog, ImageId, ImageRecord, MockStore,
        Point,
    };
    use imgmark::upload::Uploader;
    use imgmark::{AppConfig, DraftOutcome, EventBus, ImageAnnotator, ImageLayout};
    use pollster::block_on;

    type Store = MockStore<FileBackend>;

    #[derive(Parser, Debug)]
    #[command(
        name = "imgmark",
        version,
        about = "Upload images and annotate them with labelled rectangles"
    )]
    struct Cli {
        /// Directory holding the annotation store (default: platform data dir)
        #[arg(long, global = true)]
        data_dir: Option<PathBuf>,

        /// Configuration file (default: platform config dir)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand, Debug)]
    enum Commands {
        /// Register an image file and print its id and dimensions
        Upload {
            path: PathBuf,
        },
        /// List a page of images with annotation counts
        Images(ImagesArgs),
        /// Draw a rectangle through the editor and save it
        Annotate(AnnotateArgs),
        /// Print the annotations of an image as JSON
        List {
            image: String,
        },
        /// Change the label of an annotation
        Relabel {
            image: String,
            annotation: String,
            label: String,
        },
        /// Delete an annotation
        Delete {
            image: String,
            annotation: String,
        },
        /// Delete an image together with its annotations
        #[command(name = "delete-image")]
        DeleteImage {
            image: String,
        },
        /// Print labelling progress
        Stats,
        /// Print the effective configuration
        Config {
            /// Write it to --config, or to the default config file
            #[arg(long)]
            init: bool,
            /// Overwrite an existing file
            #[arg(long, requires = "init")]
            force: bool,
        },
    }

    #[derive(Args, Debug)]
    struct ImagesArgs {
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Images per page (default from configuration)
        #[arg(long)]
        limit: Option<usize>,
        /// all, annotated or unannotated
        #[arg(long, default_value_t = AnnotationFilter::All)]
        filter: AnnotationFilter,
        /// Show the N most recent uploads instead of a page
        #[arg(long, value_name = "N")]
        recent: Option<usize>,
    }

    #[derive(Args, Debug)]
    struct AnnotateArgs {
        image: String,
        /// Pointer-down position in displayed pixels, as X,Y
        #[arg(long, value_parser = parse_point)]
        from: Point,
        /// Pointer-up position in displayed pixels, as X,Y
        #[arg(long, value_parser = parse_point)]
        to: Point,
        #[arg(long)]
        label: String,
        /// Displayed image size as WxH (default: natural size)
        #[arg(long, value_parser = parse_size)]
        display: Option<(f32, f32)>,
    }

    fn parse_pair(s: &str, sep: char) -> Result<(f32, f32), String> {
        let (a, b) = s
            .split_once(sep)
            .ok_or_else(|| format!("expected two numbers separated by '{}'", sep))?;
        let a = a.trim().parse::<f32>().map_err(|e| e.to_string())?;
        let b = b.trim().parse::<f32>().map_err(|e| e.to_string())?;
        Ok((a, b))
    }

    fn parse_point(s: &str) -> Result<Point, String> {
        parse_pair(s, ',').map(|(x, y)| Point::new(x, y))
    }

    fn parse_size(s: &str) -> Result<(f32, f32), String> {
        let (w, h) = parse_pair(&s.to_lowercase(), 'x')?;
        if w <= 0.0 || h <= 0.0 {
            return Err("display size must be positive".to_string());
        }
        Ok((w, h))
    }

    /// Start logging at warn level until the configuration is known.
    /// Returns true when `RUST_LOG` decides the level instead.
    fn init_logging() -> bool {
        let from_env = std::env::var_os("RUST_LOG").is_some();
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Trace)
            .parse_default_env()
            .init();
        if !from_env {
            log::set_max_level(log::LevelFilter::Warn);
        }
        from_env
    }

    fn load_config(path: Option<&Path>) -> AppConfig {
        let loaded = match path {
            Some(path) => AppConfig::load_from_path(path),
            None => AppConfig::load_from_default_path(),
        };
        match loaded {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                log::warn!("Ignoring configuration, using defaults: {}", e);
                AppConfig::default()
            }
        }
    }

    fn write_config(path: Option<&Path>, config: &AppConfig, force: bool) -> Result<()> {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => AppConfig::default_path().context("could not determine a config directory")?,
        };
        if target.exists() && !force {
            bail!("{} already exists; pass --force to replace it", target.display());
        }
        config.save_to_path(&target)?;
        println!("Wrote {}", target.display());
        Ok(())
    }

    fn print_images<'a>(
        images: impl IntoIterator<Item = &'a ImageRecord>,
        badges: &AnnotationBadges,
    ) {
        for image in images {
            println!(
                "{}\t{}x{}\t{} annotations\t{}",
                image.id,
                image.natural_width,
                image.natural_height,
                badges.count(&image.id),
                image.title
            );
        }
    }

    fn open_store(cli: &Cli, config: &AppConfig) -> Result<Rc<Store>> {
        let dir = cli
            .data_dir
            .clone()
            .or_else(|| config.data_dir())
            .context("could not determine a data directory; pass --data-dir")?;
        let backend = FileBackend::open(&dir)
            .with_context(|| format!("failed to open store at {}", dir.display()))?;
        log::debug!("Using store at {}", dir.display());
        Ok(Rc::new(MockStore::new(backend)))
    }

    fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        let level_from_env = init_logging();
        let config = load_config(cli.config.as_deref());
        if !level_from_env {
            log::set_max_level(config.preferences.log_level.to_level_filter());
        }

        if let Commands::Config { init, force } = cli.command {
            if init {
                return write_config(cli.config.as_deref(), &config, force);
            }
            println!("{}", config.to_json()?);
            return Ok(());
        }
        let store = open_store(&cli, &config)?;

        match cli.command {
            Commands::Upload { path } => {
                let uploader = Uploader::new(store, EventBus::new());
                let record = block_on(uploader.upload_path(&path))
                    .with_context(|| format!("failed to upload {}", path.display()))?;
                println!(
                    "{}\t{}x{}\t{}",
                    record.id, record.natural_width, record.natural_height, record.title
                );
            }
            Commands::Images(args) => {
                let images = block_on(store.list_images())?;
                let badges = block_on(AnnotationBadges::load(&*store, &images))?;
                let shown: Vec<_> = badges
                    .filter(&images, args.filter)
                    .into_iter()
                    .cloned()
                    .collect();

                if let Some(count) = args.recent {
                    let latest = recent(&shown, count);
                    print_images(&latest, &badges);
                    println!("{} most recent of {} images", latest.len(), shown.len());
                    return Ok(());
                }

                let limit = args.limit.unwrap_or(config.editor.page_size);
                let page = paginate(&shown, args.page, limit);
                print_images(&page.items, &badges);
                println!(
                    "page {}/{} ({} images)",
                    page.page,
                    page.total_pages.max(1),
                    page.total
                );
            }
            Commands::Annotate(args) => annotate(store, &config, args)?,
            Commands::List { image } => {
                let annotations = block_on(store.list_annotations(&ImageId::new(image)))?;
                print_json(&annotations)?;
            }
            Commands::Relabel {
                image,
                annotation,
                label,
            } => {
                let editor =
                    block_on(ImageAnnotator::open(store, ImageId::new(image), &config.editor))?;
                let updated = block_on(editor.update_label(&AnnotationId::new(annotation), &label))?;
                print_json(&updated)?;
            }
            Commands::Delete { image, annotation } => {
                let editor =
                    block_on(ImageAnnotator::open(store, ImageId::new(image), &config.editor))?;
                block_on(editor.delete(&AnnotationId::new(annotation)))?;
                println!("{} annotations left", editor.annotations().len());
            }
            Commands::DeleteImage { image } => {
                let uploader = Uploader::new(store, EventBus::new());
                let removed = block_on(uploader.delete(&ImageId::new(image)))?;
                println!("Deleted {} ({})", removed.id, removed.title);
            }
            Commands::Stats => {
                let images = block_on(store.list_images())?;
                let badges = block_on(AnnotationBadges::load(&*store, &images))?;
                print_json(&badges.stats(&images))?;
            }
            // Handled before the store is opened.
            Commands::Config { .. } => {}
        }
        Ok(())
    }

    fn annotate(store: Rc<Store>, config: &AppConfig, args: AnnotateArgs) -> Result<()> {
        let image_id = ImageId::new(args.image);
        let record = block_on(store.get_image(&image_id))?;
        let natural = (record.natural_width as f32, record.natural_height as f32);
        let (width, height) = args.display.unwrap_or(natural);

        let editor = block_on(ImageAnnotator::open(store, image_id, &config.editor))?;
        editor.set_layout(Some(ImageLayout::new(
            0.0, 0.0, width, height, natural.0, natural.1,
        )));

        editor.pointer_down(args.from);
        editor.pointer_move(args.to);
        match editor.pointer_up(args.to) {
            DraftOutcome::AwaitingLabel(_) => {}
            DraftOutcome::TooSmall(rect) => {
                let (min_w, min_h) = (config.editor.min_draft_width, config.editor.min_draft_height);
                bail!(
                    "rectangle {}x{} must be larger than {}x{}",
                    rect.width,
                    rect.height,
                    min_w,
                    min_h
                );
            }
            other => bail!("drag was not accepted: {:?}", other),
        }

        editor.set_label(&args.label);
        let saved = block_on(editor.confirm_label())?;
        print_json(&saved)
    }

}
