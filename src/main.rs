use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use tscast::{CancelFlag, FfmpegDemuxer, FfmpegMuxer, RunSummary};

/// Remux a media file into MPEG-TS at real-time pace.
#[derive(Parser, Debug)]
#[command(name = "tscast", version, about)]
struct Args {
    /// Input media file
    #[arg(short = 'i', value_name = "input_file")]
    input: PathBuf,

    /// Destination path or URL (e.g. udp://127.0.0.1:1234)
    #[arg(value_name = "output_url")]
    output_url: String,
}

const OUTPUT_FORMAT: &str = "mpegts";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap prints the usage text itself; -h/--version are not
            // errors, everything else exits non-zero before any FFmpeg
            // call.
            let code = u8::from(e.use_stderr());
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if !args.input.is_file() {
        eprintln!(
            "invalid parameter: input file does not exist: {}",
            args.input.display()
        );
        return ExitCode::FAILURE;
    }

    match remux(&args) {
        Ok(summary) => {
            info!(
                "done: {} packets written ({} video frames), {} dropped",
                summary.packets_written, summary.video_frames, summary.packets_dropped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn remux(args: &Args) -> tscast::Result<RunSummary> {
    let mut demuxer = FfmpegDemuxer::open(&args.input)?;
    let scorer = demuxer.best_stream_scorer();
    let mut muxer = FfmpegMuxer::new(args.output_url.as_str(), OUTPUT_FORMAT);
    info!("relaying {} to {}", args.input.display(), muxer.url());
    tscast::run(&mut demuxer, &mut muxer, &scorer, &CancelFlag::new())
}
