use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rust_flipbook::overlay::TracingOverlay;
use rust_flipbook::tasks;
use rust_flipbook::{Configuration, Engine, FrameEvent, PlaybackEvent};

#[derive(Debug, Parser)]
#[command(
    name = "rust-flipbook",
    version,
    about = "Scroll-driven image sequence player"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Progress (0-based frame position) the scrub starts at
    #[arg(long, value_name = "FRAME", default_value_t = 0.0)]
    from: f32,
    /// Progress the scrub ends at; defaults to the last frame
    #[arg(long, value_name = "FRAME")]
    to: Option<f32>,
    /// How long the scrub takes, e.g. `10s` or `1m 30s`
    #[arg(long, value_name = "DURATION", default_value = "10s", value_parser = humantime::parse_duration)]
    scrub_duration: Duration,
    /// Override the configured viewport
    #[arg(long, value_name = "WxH", value_parser = parse_viewport)]
    viewport: Option<(u32, u32)>,
    /// Write the final surface to this PNG file
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn parse_viewport(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got `{s}`"))?;
    let width: u32 = w.trim().parse().context("invalid viewport width")?;
    let height: u32 = h.trim().parse().context("invalid viewport height")?;
    anyhow::ensure!(width > 0 && height > 0, "viewport must be non-empty");
    Ok((width, height))
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "info,rust_flipbook=debug",
        _ => "info,rust_flipbook=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cfg = Configuration::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", args.config.display(), cfg);

    let engine = Engine::from_config(&cfg, TracingOverlay::default())
        .context("failed to build playback engine")?;
    let requests = engine.frame_requests();
    let to = args.to.unwrap_or((cfg.frames.count - 1) as f32);
    tracing::info!(
        frames = cfg.frames.count,
        labels = cfg.labels.len(),
        from = args.from,
        to,
        "starting playback"
    );

    // Channels (small/bounded)
    let (frames_tx, frames_rx) = mpsc::channel::<FrameEvent>(cfg.loader.max_concurrent_decodes); // Loader -> Playback
    let (resize_tx, resize_rx) = mpsc::channel::<(u32, u32)>(4); // Host -> Playback
    let (events_tx, mut events_rx) = mpsc::channel::<PlaybackEvent>(64); // Playback -> Host
    let (progress_tx, progress_rx) = watch::channel(args.from); // Scrub -> Playback

    if let Some(viewport) = args.viewport {
        resize_tx
            .send(viewport)
            .await
            .context("failed to queue viewport override")?;
    }

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Loader
    tasks.spawn({
        let cancel = cancel.clone();
        let max_in_flight = cfg.loader.max_concurrent_decodes;
        let timeout = cfg.loader.timeout;
        async move {
            tasks::loader::run(requests, frames_tx, cancel, max_in_flight, timeout)
                .await
                .context("loader task failed")
        }
    });

    // Scrub driver
    let scrub = tokio::spawn({
        let cancel = cancel.clone();
        let from = args.from;
        let duration = args.scrub_duration;
        let tick = cfg.playback.tick_interval();
        async move {
            tasks::scrub::run(progress_tx, from, to, duration, tick, cancel)
                .await
                .context("scrub task failed")
        }
    });

    // Stop once the scrub has finished and every frame has settled
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            let mut scrub = scrub;
            let mut scrub_done = false;
            let mut settled = false;
            loop {
                select! {
                    _ = cancel.cancelled() => break,
                    res = &mut scrub, if !scrub_done => {
                        scrub_done = true;
                        res.context("scrub task panicked")??;
                    }
                    Some(event) = events_rx.recv() => {
                        if let PlaybackEvent::Settled(s) = event {
                            tracing::info!(loaded = s.loaded, failed = s.failed, "sequence settled");
                            settled = true;
                        }
                    }
                }
                if scrub_done && settled {
                    tracing::info!("scrub complete; shutting down");
                    cancel.cancel();
                    break;
                }
            }
            Ok::<_, anyhow::Error>(())
        }
    });

    let engine = tasks::playback::run(
        engine,
        progress_rx,
        frames_rx,
        resize_rx,
        events_tx,
        cfg.playback.tick_interval(),
        cancel.clone(),
    )
    .await
    .context("playback failed")?;
    // Ensure other tasks are asked to stop
    cancel.cancel();
    drop(resize_tx);

    // Drain JoinSet (wait for other tasks to complete)
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    tracing::info!(
        progress = engine.progress(),
        label = ?engine.label_state().label(),
        overlays = engine.host().live(),
        "playback stopped"
    );

    if let Some(path) = args.snapshot {
        engine
            .surface()
            .pixels()
            .save(&path)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        tracing::info!("wrote snapshot to {}", path.display());
    }

    Ok(())
}
