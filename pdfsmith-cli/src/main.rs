use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use pdfsmith::{
    CreationSettings, DocumentDriver, DocumentMetadata, Font, ImagePlacement, InputSource,
    LogConfig, OutputTarget, PageRange, PdfError, PdfReader, PdfVersion, Rectangle,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pdfsmith",
    about = "Build and incrementally update PDF documents",
    version,
    author
)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write the session log to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a PDF with one page per image (JPEG, TIFF or PDF page)
    Images {
        /// Image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Document title
        #[arg(long)]
        title: Option<String>,
    },

    /// Concatenate pages of several PDFs
    Append {
        /// Input PDF files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Pages taken from each input (e.g. "all", "1-3,5")
        #[arg(short, long, default_value = "all")]
        pages: String,
    },

    /// Add a text page to an existing PDF as an incremental update
    AddPage {
        /// Input PDF file
        input: PathBuf,

        /// Output file path (defaults to updating the input in place)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Text to put on the new page
        #[arg(short, long)]
        text: String,

        /// Font size in points
        #[arg(long, default_value = "24")]
        size: f64,
    },

    /// Get information about a PDF file
    Info {
        /// Input PDF file
        input: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "pdfsmith=debug"
    } else {
        "pdfsmith=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn log_config(log_file: Option<PathBuf>, verbose: bool) -> LogConfig {
    match log_file {
        Some(path) => {
            let config = LogConfig::to_file(path);
            if verbose {
                config
            } else {
                config.with_filter("pdfsmith=info")
            }
        }
        // Session events go to the global subscriber
        None => LogConfig::default(),
    }
}

fn locator(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("path is not valid UTF-8: {}", path.display()))
}

fn create_from_images(
    images: &[PathBuf],
    output: &Path,
    title: Option<String>,
    log: LogConfig,
) -> Result<usize> {
    let mut metadata = DocumentMetadata::now();
    metadata.title = title;
    let settings = CreationSettings::default().with_metadata(metadata);

    let (pages, _) = DocumentDriver::with_document(
        OutputTarget::file(output),
        PdfVersion::V1_7,
        log,
        settings,
        |driver| {
            let mut pages = 0;
            for image in images {
                let locator = locator(image)
                    .map_err(|e| PdfError::InvalidArgument(e.to_string()))?;
                for index in 0.. {
                    let dimensions = match driver.get_image_dimensions(locator, index) {
                        Ok(dimensions) => dimensions,
                        Err(PdfError::PageIndexOutOfRange { .. }) if index > 0 => break,
                        Err(e) => return Err(e),
                    };
                    if dimensions.is_unknown() {
                        return Err(PdfError::UnsupportedImageFormat(locator.to_string()));
                    }

                    let page = driver.create_page(Rectangle::from_position_and_size(
                        0.0,
                        0.0,
                        dimensions.width,
                        dimensions.height,
                    ))?;
                    let handle = driver.start_page_content_context(page)?;
                    driver.content(handle)?.draw_image(
                        locator,
                        index,
                        0.0,
                        0.0,
                        ImagePlacement::Natural,
                    )?;
                    driver.write_page(page)?;
                    pages += 1;
                }
            }
            Ok(pages)
        },
    )?;
    Ok(pages)
}

fn append_documents(files: &[PathBuf], output: &Path, pages: &str, log: LogConfig) -> Result<usize> {
    let range = PageRange::parse(pages)
        .with_context(|| format!("invalid page range '{pages}'"))?;

    let (count, _) = DocumentDriver::with_document(
        OutputTarget::file(output),
        PdfVersion::V1_7,
        log,
        CreationSettings::default(),
        |driver| {
            let mut count = 0;
            for file in files {
                count += driver
                    .append_pdf_pages_from_pdf(InputSource::file(file), &range)?
                    .len();
            }
            Ok(count)
        },
    )?;
    Ok(count)
}

fn add_text_page(
    input: &Path,
    output: Option<&Path>,
    text: &str,
    size: f64,
    log: LogConfig,
) -> Result<usize> {
    let mut driver = DocumentDriver::new();
    driver.modify_pdf(
        InputSource::file(input),
        PdfVersion::V1_7,
        output.map(OutputTarget::file),
        log,
        CreationSettings::default(),
    )?;

    let media_box = Rectangle::a4();
    let page = driver.create_page(media_box)?;
    let handle = driver.start_page_content_context(page)?;
    driver.content(handle)?.text_at(
        Font::Helvetica,
        size,
        50.0,
        media_box.height() - 50.0 - size,
        text,
    )?;
    driver.write_page(page)?;

    let original = driver.modified_source_page_count().unwrap_or(0);
    driver.end()?;
    Ok(original + 1)
}

fn print_info(input: &Path) -> Result<()> {
    let mut reader = PdfReader::open(input)
        .with_context(|| format!("failed to parse {}", input.display()))?;

    println!("PDF Information for: {}", input.display());
    println!("==========================================");
    println!("PDF Version: {}", reader.version());
    println!("Objects: {}", reader.xref().in_use_count());
    println!("Cross-reference sections: {}", reader.xref().sections());
    if reader.xref().is_recovered() {
        println!("Cross-reference data was damaged and has been rebuilt");
    }

    if let Some(info) = reader.info()? {
        for key in ["Title", "Author", "Subject", "Creator", "Producer"] {
            if let Some(value) = info.get(key).and_then(|value| value.as_string()) {
                println!("{key}: {}", String::from_utf8_lossy(value));
            }
        }
    }

    let count = reader.page_count()?;
    println!("Pages: {count}");
    let pages_to_show = count.min(3);
    for index in 0..pages_to_show {
        if let Some(page) = reader.page(index)? {
            println!(
                "Page {}: {:.0}x{:.0} pts",
                index + 1,
                page.width(),
                page.height()
            );
        }
    }
    if count > pages_to_show {
        println!("... and {} more pages", count - pages_to_show);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let log = log_config(cli.log_file, cli.verbose);

    match cli.command {
        Commands::Images {
            images,
            output,
            title,
        } => {
            let pages = create_from_images(&images, &output, title, log)?;
            println!("✓ Created {} with {pages} pages", output.display());
        }

        Commands::Append {
            files,
            output,
            pages,
        } => {
            let count = append_documents(&files, &output, &pages, log)?;
            println!("✓ Appended {count} pages to {}", output.display());
        }

        Commands::AddPage {
            input,
            output,
            text,
            size,
        } => {
            if size <= 0.0 {
                bail!("font size must be positive");
            }
            let pages = add_text_page(&input, output.as_deref(), &text, size, log)?;
            let target = output.as_deref().unwrap_or(&input);
            println!("✓ Updated {} ({pages} pages)", target.display());
        }

        Commands::Info { input } => print_info(&input)?,
    }

    Ok(())
}
