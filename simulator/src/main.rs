use anyhow::Context;
use clap::Parser;
use report_bridge::ReportBridge;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod driver;
mod generator;
mod report_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline TDM-ISAC scan-cycle driver")]
struct Args {
    /// Run the configured number of frames offline and emit a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Override the number of frames to simulate
    #[arg(long)]
    frames: Option<u64>,
    /// Keep the report endpoint alive after the run
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::default()
    };
    if let Some(frames) = args.frames {
        config.frames = frames;
    }

    let runner = Runner::new(config);
    let bridge = ReportBridge::new();

    if args.offline {
        let summary = runner.execute()?;

        println!(
            "Offline run -> frames {}, dwell activations {}, comms entries {}, detections {}",
            summary.frames,
            summary.dwell_activations,
            summary.comms_entries,
            summary.metrics.detections_reported
        );

        if let Some(report) = summary.reports.last() {
            bridge.publish(report, summary.metrics)?;
            bridge.publish_status("Offline scan-cycle results ready.");
        }

        let line = format!(
            "frames={} activations={} comms_samples={} overruns={} drops={} detections={}\n",
            summary.frames,
            summary.dwell_activations,
            summary.comms_samples,
            summary.metrics.switch_overruns,
            summary.metrics.dropped_dwells,
            summary.metrics.detections_reported
        );
        let report_path = PathBuf::from("tools/data/offline_scan.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report_path)?;
        file.write_all(line.as_bytes())?;
    }
    if args.serve {
        bridge.publish_status("HTTP report endpoint running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
