use stepview::{check, normalize_report, parse_report, read_transcript, spans_report, tables_report};
use stepview::{logging, tui, App, Settings};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stepview", version, about = "Parse agent transcripts into collapsible steps")]
struct Cli {
    /// Transcript to read; `-` reads stdin
    #[arg(long, short, default_value = "-")]
    transcript: PathBuf,
    /// Treat the transcript as a stream still in progress
    #[arg(long)]
    streaming: bool,
    /// Skip the viewer and run a subcommand directly
    #[arg(long)]
    no_tui: bool,
    /// Start the viewer by replaying the transcript chunk by chunk
    #[arg(long)]
    replay: bool,
    /// Override the replay chunk size from the settings file
    #[arg(long)]
    chunk_chars: Option<usize>,
    /// Debug-level logging
    #[arg(long, short)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the transcript with dangling tags closed
    Normalize,
    /// Print the classified spans
    Spans,
    /// Print step containers and render sections
    Parse {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Report open/close delimiter counts per tag
    Check,
    /// Print CSV tables found in observations
    Tables,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // If a subcommand is given or --no-tui is set, run in CLI mode
    if cli.no_tui || cli.command.is_some() {
        logging::init_stderr(cli.verbose);
        let text = read_transcript(&cli.transcript)?;
        let out = match cli.command {
            Some(Commands::Normalize) => normalize_report(&text, cli.streaming),
            Some(Commands::Spans) => spans_report(&text, cli.streaming),
            Some(Commands::Parse { json }) => parse_report(&text, cli.streaming, json)?,
            Some(Commands::Check) => check(&text, cli.streaming)?,
            Some(Commands::Tables) => tables_report(&text, cli.streaming),
            None => parse_report(&text, cli.streaming, false)?,
        };
        print!("{out}");
        Ok(())
    } else {
        logging::init_file(cli.verbose)?;
        let mut settings = Settings::load()?;
        if let Some(n) = cli.chunk_chars {
            settings.replay_chunk_chars = n.max(1);
        }
        let text = read_transcript(&cli.transcript)?;
        let mut app = App::new(cli.transcript.display().to_string(), text, settings);
        if cli.streaming && !cli.replay {
            app.streaming = true;
            app.reparse();
        }
        tui::run(app, cli.replay).await
    }
}
