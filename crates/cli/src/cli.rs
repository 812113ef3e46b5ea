use clap::Parser;

/// Demo host for the ownerless routine scheduler.
///
/// Drives a scheduler and an update list at a fixed frame rate, the way a
/// game loop would, then prints the scheduler metrics as JSON.
#[derive(Parser, Debug)]
#[command(name = "ownerless", version, about = "Demo host for the ownerless routine scheduler")]
pub struct CliArgs {
    /// Path to a TOML config file with [scheduler] and [host] sections
    #[arg(long, env = "OWNERLESS_CONFIG")]
    pub config: Option<String>,

    /// Number of frames to run (overrides the config file)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Frame length in milliseconds (overrides the config file)
    #[arg(long)]
    pub frame_ms: Option<u64>,

    /// Sleep for the frame length between frames
    #[arg(long)]
    pub realtime: bool,

    /// Log every routine step at debug level
    #[arg(long)]
    pub trace_steps: bool,
}
