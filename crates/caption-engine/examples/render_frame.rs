//! Example: draw one caption onto a blank frame
//!
//! Usage: `cargo run --example render_frame -- [config.json] [text]`

use anyhow::Context;
use caption_engine::{
    CaptionPipeline, Config, DirectoryFrameStore, FrameStore, PixelFormat, TargetImage,
};

fn main() -> anyhow::Result<()> {
    caption_engine::logging::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => Config::load(&path).with_context(|| format!("loading {path}"))?,
        None => Config {
            point_size: 64,
            cache_path: None,
            ..Config::default()
        },
    };
    let text = args.next().unwrap_or_else(|| "Hello, captions".to_string());

    let pipeline = CaptionPipeline::new(config).context("creating caption pipeline")?;
    println!("Caption Engine v{} initialized", caption_engine::VERSION);

    let layout = pipeline.scheduler().measure(&text)?;
    println!(
        "{:?}: {}x{} px, baseline {}",
        text, layout.width, layout.height, layout.baseline
    );

    let mut frame = TargetImage::filled(1280, 720, PixelFormat::Rgba, [24, 24, 32, 255]);
    pipeline.render_word(&text, &mut frame)?;

    let mut store = DirectoryFrameStore::new(std::env::temp_dir(), "png");
    store.write_frame(1, &frame)?;
    pipeline.flush()?;

    println!("Wrote {}", store.frame_path(1).display());
    Ok(())
}
