use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_assistant::{AiService, ApiServerBuilder, Config, VoiceService};

/// Voice Assistant - web backend for an AI voice assistant
#[derive(Parser)]
#[command(name = "voice-assistant", version, about)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP and WebSocket server (default)
    Serve,
    /// Show configuration and test the AI provider
    Check,
    /// Synthesize speech to a WAV file
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
        /// Output file
        #[arg(short, long, default_value = "speech.wav")]
        output: PathBuf,
    },
    /// Transcribe a WAV or raw PCM16 file
    Transcribe {
        /// Audio file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,voice_assistant=info",
        1 => "info,voice_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Check => check(&config).await,
        Command::Say { text, output } => say(&config, &text, &output).await,
        Command::Transcribe { path } => transcribe(&config, &path).await,
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        provider = %config.ai.provider,
        "starting voice assistant"
    );

    let server = ApiServerBuilder::from_config(config)?.build();
    server.run().await?;

    Ok(())
}

/// Print provider status and try one AI round trip
async fn check(config: &Config) -> anyhow::Result<()> {
    let ai = AiService::from_config(config)?;
    let voice = VoiceService::from_config(config)?;

    let status = ai.status().await;
    let caps = voice.capabilities();

    println!("AI provider");
    println!("  preferred:   {}", status.preferred);
    println!("  active:      {}", status.active);
    println!("  perplexity:  {}", configured(status.perplexity_configured));
    println!("  openai:      {}", configured(status.openai_configured));
    println!("Voice");
    println!("  stt:         {}", configured(caps.stt_available));
    println!("  tts:         {}", configured(caps.tts_available));
    println!("  sample rate: {} Hz", config.audio.sample_rate);
    println!("History");
    match &config.history.database_path {
        Some(path) => println!("  database:    {}", path.display()),
        None => println!("  database:    in-memory"),
    }
    println!("  capacity:    {} exchanges", config.history.max_exchanges);
    println!("Server");
    println!("  listen:      {}:{}", config.server.host, config.server.port);
    println!(
        "  secret key:  {}",
        if config.uses_default_secret() { "placeholder (set SECRET_KEY)" } else { "set" }
    );

    let connected = ai.test_connection().await;
    println!("\nConnection test: {}", if connected { "ok" } else { "FAILED" });

    if !connected {
        anyhow::bail!("AI provider did not respond");
    }
    Ok(())
}

const fn configured(yes: bool) -> &'static str {
    if yes { "configured" } else { "not configured" }
}

async fn say(config: &Config, text: &str, output: &Path) -> anyhow::Result<()> {
    let voice = VoiceService::from_config(config)?;
    let wav = voice.synthesize(text).await?;

    std::fs::write(output, &wav)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} bytes to {}", wav.len(), output.display());
    Ok(())
}

async fn transcribe(config: &Config, path: &Path) -> anyhow::Result<()> {
    let audio = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let voice = VoiceService::from_config(config)?;
    let result = voice.transcribe(&audio).await?;

    println!("{}", result.text);
    tracing::debug!(level = result.level, "input level");
    Ok(())
}
