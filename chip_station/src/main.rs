mod cli;
mod controls;
mod image_helper;
mod render;
mod tick_rate;

use anyhow::Context;
use chip_vision::core_modules::template::ChipTemplates;
use chip_vision::frame_feed::FrameFeed;
use chip_vision::frame_source::{DirectorySource, PlaceholderSource, SyntheticSource};
use chip_vision::{ChipClass, ChipPipeline, Command, FrameError, RunMode, StationConfig};
use clap::Parser;
use cli::{Cli, Mode};
use image::RgbImage;
use image_helper::image_helper::{save, snapshot_path};
use log::{info, warn};
use render::Renderer;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tick_rate::TickRate;

struct Snapshots {
    dir: PathBuf,
    every: u64,
}

impl Snapshots {
    fn due(&self, tick: u64) -> bool {
        self.every > 0 && tick % self.every == 0
    }

    fn save(&self, tick: u64, frame: &RgbImage) {
        let path = snapshot_path(&self.dir, tick);
        match save(&path, frame) {
            Ok(()) => info!("Saved {}", path.display()),
            Err(e) => warn!("Could not save {}: {}", path.display(), e),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StationConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StationConfig::default(),
    };
    let seed = cli
        .seed
        .or(config.spawning.seed)
        .unwrap_or_else(rand::random);

    let mode = match cli.mode {
        Mode::Conveyor => RunMode::Conveyor,
        Mode::Camera { .. } => RunMode::Camera,
        Mode::Interactive => RunMode::Interactive,
    };
    let mut pipeline = ChipPipeline::new(mode, &config, seed)?;

    let snapshots = match &cli.snapshot_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            Some(Snapshots {
                dir: dir.clone(),
                every: cli.snapshot_every,
            })
        }
        None => None,
    };
    let templates = if snapshots.is_some() && mode != RunMode::Camera {
        ChipTemplates::load(
            &config.runtime.assets_dir,
            config.scene.chip_width,
            config.scene.chip_height,
        )
    } else {
        ChipTemplates::placeholders(config.scene.chip_width, config.scene.chip_height)
    };
    let renderer = Renderer::new(config.scene.clone(), templates);

    let mut feed = match &cli.mode {
        Mode::Camera {
            frames,
            synthetic,
            calibrate_dir,
        } => {
            if let Some(dir) = calibrate_dir {
                calibrate(&mut pipeline, dir);
            }
            let capacity = config.runtime.frame_queue_capacity;
            Some(match frames {
                Some(dir) => FrameFeed::spawn(DirectorySource::open(dir)?, capacity),
                None if *synthetic => FrameFeed::spawn(SyntheticSource::new(&config, seed)?, capacity),
                None => {
                    warn!("No camera attached; showing the placeholder frame");
                    FrameFeed::spawn(PlaceholderSource::new(&config.scene), capacity)
                }
            })
        }
        _ => None,
    };
    let placeholder = PlaceholderSource::new(&config.scene).frame();
    let mut last_frame: Option<RgbImage> = None;

    info!("Controls: {}", controls::help(mode));
    let mut console = controls::spawn_console_reader();
    let mut console_open = true;
    let mut interval = tokio::time::interval(Duration::from_millis(config.runtime.tick_ms));
    let mut tick = 0u64;
    let mut rate = TickRate::new();

    'run: loop {
        tokio::select! {
            _ = interval.tick() => {
                tick += 1;
                rate.record(Instant::now());
                match feed.as_mut() {
                    None => {
                        pipeline.tick();
                    }
                    Some(feed) => match feed.try_next() {
                        Some(buffer) => match buffer.frame {
                            Ok(frame) => {
                                pipeline.process_frame(&frame);
                                last_frame = Some(frame);
                            }
                            Err(FrameError::Exhausted) => {
                                info!("Frame source exhausted after {} frames", buffer.frame_id);
                                break 'run;
                            }
                            Err(e) => {
                                pipeline.skip_frame(&e);
                                last_frame = None;
                            }
                        },
                        None => {}
                    },
                }

                if let Some(snapshots) = snapshots.as_ref().filter(|s| s.due(tick)) {
                    let frame = match mode {
                        RunMode::Camera => renderer.camera(last_frame.as_ref().unwrap_or(&placeholder), &pipeline),
                        _ => renderer.conveyor(&pipeline),
                    };
                    snapshots.save(tick, &frame);
                }
                if cli.ticks.is_some_and(|limit| tick >= limit) {
                    break 'run;
                }
            }
            line = console.recv(), if console_open => match line {
                Some(line) => {
                    let Some(command) = controls::line_command(mode, &line, config.spawning.burst_size) else {
                        continue;
                    };
                    if pipeline.apply(command) == chip_vision::Flow::Stop {
                        break 'run;
                    }
                    if command == Command::ResetStats {
                        info!("Stats: {:?}", pipeline.snapshot());
                    }
                }
                None => console_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break 'run;
            }
        }
    }

    if let Some(feed) = feed {
        feed.shutdown().await;
    }
    if let Some(snapshots) = &snapshots {
        let frame = match mode {
            RunMode::Camera => renderer.camera(last_frame.as_ref().unwrap_or(&placeholder), &pipeline),
            _ => renderer.conveyor(&pipeline),
        };
        snapshots.save(tick, &frame);
    }
    log_summary(&pipeline, tick, &rate);
    Ok(())
}

fn calibrate(pipeline: &mut ChipPipeline, dir: &Path) {
    for class in ChipClass::ALL {
        let path = dir.join(format!("{}.png", class.name().to_lowercase()));
        let frame = match image::open(&path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                warn!("Skipping {} calibration, {}: {}", class, path.display(), e);
                continue;
            }
        };
        if let Err(e) = pipeline.classifier_mut().calibrate_frame(&frame, class) {
            warn!("{} calibration failed, keeping previous profile: {}", class, e);
        }
    }
}

fn log_summary(pipeline: &ChipPipeline, ticks: u64, rate: &TickRate) {
    let stats = pipeline.snapshot();
    let session = pipeline.session();
    info!("Session ended after {} ticks", ticks);
    if let Some(per_second) = rate.per_second() {
        info!("  Tick rate:   {:.1}/s (last {} ticks)", per_second, tick_rate::WINDOW);
    }
    info!("  Total value: {} CR", stats.total_value);
    info!("  Real chips:  {}", stats.real_count);
    info!("  Fake chips:  {}", stats.fake_count);
    info!("  Scanned:     {}", stats.counted());
    if stats.real_count > 0 {
        info!("  Average:     {:.1} CR", session.average_value());
    }
    for class in ChipClass::ALL {
        let tally = session.class_tally(class);
        if tally.count > 0 {
            info!("  {:<6} {:>4} chips, {} CR", class.name(), tally.count, tally.value);
        }
    }
}
