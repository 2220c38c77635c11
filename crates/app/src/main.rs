use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use visual_surface_core::{
    blit, blit_scale_area, fill_color, fill_color_area, rotate, scaled, AppConfig, Color,
    CompositeStrategy, Depth, DepthSet, Palette, PipelineConfig, PixelBuffer, Rectangle,
    Rotation, Surface, VideoError,
};
use tracing_subscriber::EnvFilter;

fn main() -> visual_surface_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { config, output } => run_render(config.as_deref(), &output),
        Commands::Depths { flags } => run_depths(flags),
        Commands::Config { output } => run_config(&output),
    }
}

fn run_render(config: Option<&Path>, output: &Path) -> visual_surface_core::Result<()> {
    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let screen_config = &config.display;
    tracing::info!(
        width = screen_config.width,
        height = screen_config.height,
        depth = ?screen_config.depth,
        ?output,
        "rendering frame"
    );

    // The frame memory belongs to the backend; the surface only borrows it.
    let len = screen_config
        .width
        .checked_mul(screen_config.height)
        .and_then(|pixels| {
            pixels.checked_mul(screen_config.depth.bytes_per_pixel().ok()?)
        })
        .ok_or(VideoError::AllocationFailure(usize::MAX))?;
    let frame = PixelBuffer::zeroed(len)?;

    let mut screen = Surface::wrap(
        frame.clone(),
        screen_config.width,
        screen_config.height,
        screen_config.depth,
        false,
    )?;
    if screen_config.depth == Depth::Indexed8 {
        screen.set_palette(Palette::grayscale());
    }

    draw_frame(&mut screen, &config.pipeline)?;
    let palette = screen.palette().cloned();
    drop(screen);

    // Present from the backend's own handle, as a display would.
    let mut presented = Surface::wrap(
        frame,
        screen_config.width,
        screen_config.height,
        screen_config.depth,
        false,
    )?;
    if let Some(palette) = palette {
        presented.set_palette(palette);
    }
    write_ppm(&presented, output)?;

    tracing::info!(?output, "frame written");
    Ok(())
}

fn draw_frame(screen: &mut Surface, pipeline: &PipelineConfig) -> visual_surface_core::Result<()> {
    let (width, height, depth) = (screen.width(), screen.height(), screen.depth());
    fill_color(screen, pipeline.background)?;

    // Palette ramp stretched across the top quarter.
    let ramp = gradient_strip()?;
    let band = scaled(&ramp, width, (height / 4).max(1), depth, pipeline.scale_method)?;
    blit(screen, &band, 0, 0, false)?;

    let board = checkerboard(screen, 8, 8)?;
    let board_area = Rectangle::new(
        (width / 4) as i32,
        (height / 4) as i32,
        (width / 2) as i32,
        (height / 2) as i32,
    );
    blit_scale_area(
        screen,
        &board_area,
        &board,
        &board.extents(),
        false,
        pipeline.scale_method,
    )?;

    let sprite = keyed_sprite(screen, pipeline.colorkey, height / 3, height / 5)?;
    let mut turned = Surface::allocate(sprite.height(), sprite.width(), depth)?;
    if let Some(palette) = screen.palette() {
        turned.set_palette(palette.clone());
    }
    rotate(&mut turned, &sprite, Rotation::Deg90)?;
    turned.set_compose_strategy(sprite.compose_strategy().clone());
    blit(screen, &sprite, 4, (height / 2) as i32, true)?;
    blit(screen, &turned, width as i32 - turned.width() as i32 - 4, 4, true)?;

    if depth == Depth::Indexed8 {
        tracing::warn!("surface alpha needs a direct color display, skipping overlay");
        return Ok(());
    }

    let mut banner = Surface::allocate(width, (height / 6).max(1), depth)?;
    fill_color(&mut banner, Color::WHITE)?;
    banner.set_compose_strategy(CompositeStrategy::SurfaceAlpha(pipeline.surface_alpha));
    blit(screen, &banner, 0, (height - banner.height()) as i32, true)?;

    Ok(())
}

fn gradient_strip() -> visual_surface_core::Result<Surface> {
    let colors = (0..=255u8)
        .map(|i| Color::rgb(i, 255 - i, 128))
        .collect();

    let mut strip = Surface::allocate(256, 1, Depth::Indexed8)?;
    strip.set_palette(Palette::from_colors(colors)?);
    strip
        .pixels_mut()?
        .iter_mut()
        .zip(0..=255u8)
        .for_each(|(pixel, index)| *pixel = index);
    Ok(strip)
}

fn checkerboard(screen: &Surface, cells: usize, cell: usize) -> visual_surface_core::Result<Surface> {
    let size = cells * cell;
    let mut board = Surface::allocate(size, size, screen.depth())?;
    if let Some(palette) = screen.palette() {
        board.set_palette(palette.clone());
    }

    for row in 0..cells {
        for col in 0..cells {
            let color = if (row + col) % 2 == 0 {
                Color::rgb(230, 230, 230)
            } else {
                Color::rgb(40, 40, 40)
            };
            let area = Rectangle::new(
                (col * cell) as i32,
                (row * cell) as i32,
                cell as i32,
                cell as i32,
            );
            fill_color_area(&mut board, color, &area)?;
        }
    }
    Ok(board)
}

/// A colorkeyed rectangle with an opaque block in its middle.
fn keyed_sprite(
    screen: &Surface,
    key: Color,
    width: usize,
    height: usize,
) -> visual_surface_core::Result<Surface> {
    let mut sprite = Surface::allocate(width.max(1), height.max(1), screen.depth())?;
    if let Some(palette) = screen.palette() {
        sprite.set_palette(palette.clone());
    }

    fill_color(&mut sprite, key)?;
    let inner = Rectangle::new(
        (width / 4) as i32,
        (height / 4) as i32,
        (width / 2) as i32,
        (height / 2) as i32,
    );
    fill_color_area(&mut sprite, Color::rgb(255, 200, 0), &inner)?;
    sprite.set_compose_strategy(CompositeStrategy::ColorKey(key));
    Ok(sprite)
}

fn write_ppm(surface: &Surface, path: &Path) -> visual_surface_core::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", surface.width(), surface.height())?;

    for y in 0..surface.height() {
        for x in 0..surface.width() {
            let color = surface.pixel(x, y)?;
            out.write_all(&[color.r, color.g, color.b])?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run_depths(flags: Option<u32>) -> visual_surface_core::Result<()> {
    let set = flags.map_or(DepthSet::ALL, DepthSet::from_bits_truncate);
    tracing::info!(flags = set.bits(), "depth registry");

    for depth in set.depths() {
        match depth.bits_per_pixel() {
            Ok(bits) => println!("{depth:?}: {bits} bits per pixel"),
            Err(_) => println!("{depth:?}: not addressable"),
        }
    }
    println!("lowest: {:?}", set.lowest());
    println!("highest: {:?}", set.highest());
    println!("highest excluding gpu: {:?}", set.highest_excluding_gpu());
    Ok(())
}

fn run_config(output: &Path) -> visual_surface_core::Result<()> {
    std::fs::write(output, AppConfig::default().to_json_string()?)?;
    tracing::info!(?output, "default configuration written");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Pixel surface engine front-end", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a demonstration frame into a borrowed frame buffer.
    Render {
        /// JSON configuration; defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Destination of the binary PPM image.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List the depths contained in a flag set.
    Depths {
        /// Raw depth flags; every depth when omitted.
        #[arg(short, long)]
        flags: Option<u32>,
    },
    /// Write the default configuration as JSON.
    Config {
        #[arg(short, long)]
        output: PathBuf,
    },
}
