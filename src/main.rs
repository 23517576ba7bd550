// src/main.rs

use anyhow::Result;
use image::RgbImage;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use traffic_signal_core::frame_source::{join_vertical_strips, split_vertical_strips, FrameSource};
use traffic_signal_core::{
    Config, DensitySmoother, EmergencyReportSink, FrameMotionAnalyzer, FrameView,
    IntersectionMetrics, LaneScheduler, MotionMetrics, SchedulerHandle, SignalError,
    SignalResult, SignalTimingPolicy,
};

/// Log a progress line every this many frames
const PROGRESS_EVERY: usize = 50;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚦 Traffic Signal Core Starting");
    if config_found {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        warn!("{} not found, running with defaults", config_path);
    }
    info!(
        "Intersection: {} lanes, {:.0}s full cycle, {:.0}s yellow",
        config.scheduler.num_lanes, config.scheduler.full_cycle_secs, config.scheduler.yellow_secs
    );

    let metrics = IntersectionMetrics::new();
    let mut scheduler = LaneScheduler::with_metrics(&config.scheduler, metrics.clone())?;
    scheduler.start()?;

    let outcome = process_frames(&config, &scheduler.handle(), &metrics).await;
    if let Err(e) = &outcome {
        error!("Frame processing failed: {:#}", e);
    }

    let last = scheduler.snapshot();
    scheduler.stop().await;

    let summary = metrics.summary();
    info!("\n========================================");
    info!("✓ Run complete");
    info!("  Frames analyzed: {}", summary.frames_analyzed);
    info!("  Frames skipped: {}", summary.frames_skipped);
    info!("  🚙 Vehicles counted: {}", summary.vehicles_counted);
    info!("  🔁 Cycles completed: {}", summary.cycles_completed);
    info!(
        "  🚑 Emergency reports: {} ({} preemptions, {} rejected)",
        summary.emergency_reports, summary.preemptions, summary.rejected_reports
    );
    info!("  Processing Speed: {:.1} FPS", summary.fps);
    info!("  Final queue: {:?}", last.queue);
    info!("========================================\n");
    info!("📊 Summary JSON: {}", serde_json::to_string(&summary)?);

    outcome
}

async fn process_frames(
    config: &Config,
    scheduler: &SchedulerHandle,
    metrics: &IntersectionMetrics,
) -> Result<()> {
    let source = FrameSource::new(config.runner.clone());
    let frame_files = source.find_frame_files()?;

    if frame_files.is_empty() {
        error!("No frames found in {}", config.runner.input_dir);
        return Ok(());
    }

    let lanes = scheduler.lanes();
    let mut analyzers: Vec<FrameMotionAnalyzer> = (0..lanes)
        .map(|_| FrameMotionAnalyzer::new(config.analyzer.clone()))
        .collect();
    let mut smoothers: Vec<DensitySmoother> = (0..lanes)
        .map(|_| DensitySmoother::new(config.runner.smoother_window_size))
        .collect();
    let policy = SignalTimingPolicy::new(&config.timing);

    let mut pacing = tokio::time::interval(Duration::from_millis(
        config.runner.frame_interval_ms.max(1),
    ));
    pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for (idx, path) in frame_files.iter().enumerate() {
        pacing.tick().await;

        // Simulated detector feed
        for scripted in config
            .runner
            .emergencies
            .iter()
            .filter(|e| e.at_frame == idx as u64)
        {
            if let Err(e) = scheduler.report(scripted.lane) {
                warn!("Scripted emergency at frame {} dropped: {}", idx, e);
            }
        }

        let frame = match source.load(path) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping frame: {:#}", e);
                metrics.inc(&metrics.frames_skipped);
                continue;
            }
        };

        let started = Instant::now();
        let strips = split_vertical_strips(&frame, lanes);
        let results = analyze_lanes(&mut analyzers, &strips);
        metrics.set_timing(&metrics.analysis_time_us, started.elapsed().as_micros() as u64);

        let mut annotated = Vec::with_capacity(lanes);
        for (lane, result) in results.into_iter().enumerate() {
            match result {
                Ok((overlay, motion)) => {
                    metrics.add(&metrics.vehicles_counted, motion.vehicle_count as u64);
                    let density = smoothers[lane].smooth(motion.density);
                    let timing = policy.compute(density);
                    scheduler.set_lane_timing(lane, &timing)?;
                    debug!(
                        "Lane {}: {} vehicles, density {:.1}% (smoothed {:.1}%), green {:.1}s",
                        lane, motion.vehicle_count, motion.density, density, timing.green
                    );
                    annotated.push(overlay);
                }
                Err(e) => {
                    warn!("Lane {} skipped {}: {}", lane, path.display(), e);
                    annotated.push(strips[lane].clone());
                }
            }
        }
        metrics.inc(&metrics.frames_analyzed);

        if config.runner.output_dir.is_some() {
            let joined = join_vertical_strips(&annotated)?;
            if let Err(e) = source.save_annotated(path, &joined) {
                warn!("Could not save annotated frame: {:#}", e);
            }
        }

        if (idx + 1) % PROGRESS_EVERY == 0 {
            let snapshot = scheduler.snapshot();
            info!(
                "Progress: {}/{} frames | lane {:?} {} ({:.1}s left) | queue {:?}",
                idx + 1,
                frame_files.len(),
                snapshot.active_lane,
                snapshot.phase.as_str(),
                snapshot.remaining.as_secs_f64(),
                snapshot.queue
            );
        }
    }

    Ok(())
}

/// Run every lane's analyzer on its strip, one thread per lane.
fn analyze_lanes(
    analyzers: &mut [FrameMotionAnalyzer],
    strips: &[RgbImage],
) -> Vec<SignalResult<(RgbImage, MotionMetrics)>> {
    std::thread::scope(|scope| {
        let workers: Vec<_> = analyzers
            .iter_mut()
            .zip(strips)
            .map(|(analyzer, strip)| {
                scope.spawn(move || -> SignalResult<(RgbImage, MotionMetrics)> {
                    let view = FrameView::from_rgb_image(strip)?;
                    analyzer.analyze(&view)
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| {
                worker.join().unwrap_or_else(|_| {
                    Err(SignalError::InvalidFrame(
                        "lane analyzer panicked".to_string(),
                    ))
                })
            })
            .collect()
    })
}
