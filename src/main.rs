use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use larder::api::ApiServerBuilder;
use larder::db::{self, KitchenRepo, UserRepo};
use larder::voice::{
    AudioStream, CommandProcessor, CpalMicrophone, Feedback, Interpretation, Microphone,
    SpeechToText, SpectrumAnalyser, SpokenFeedback, TextToSpeech, TracingFeedback,
    VoiceController, WhisperTranscriber, interpret, level_bars, run_until_idle,
};
use larder::{Config, KitchenStore};

/// How often a listening session samples the microphone
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Larder - kitchen inventory and shopping list with voice commands
#[derive(Parser)]
#[command(name = "larder", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "LARDER_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable voice features (for headless servers without audio hardware)
    #[arg(long, global = true)]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Listen for voice commands on the default microphone
    Listen {
        /// Email of the account whose kitchen receives the items
        #[arg(short, long)]
        email: String,
        /// Kitchen ID; defaults to the selected kitchen
        #[arg(short, long)]
        kitchen: Option<String>,
    },
    /// Interpret a command without storing anything
    Parse {
        /// Command text, e.g. "add 2 kg of rice to inventory"
        text: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,larder=info",
        1 => "info,larder=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.port, cli.disable_voice).await,
        Command::Listen { email, kitchen } => listen(&email, kitchen.as_deref()).await,
        Command::Parse { text } => parse(&text),
        Command::TestMic { duration } => test_mic(duration).await,
    }
}

/// Run the HTTP API until interrupted
async fn serve(port: Option<u16>, disable_voice: bool) -> anyhow::Result<()> {
    let config = Config::load(disable_voice);
    tracing::debug!(data_dir = %config.data_dir.display(), voice = config.voice.enabled, "loaded configuration");

    let pool = db::init(config.db_path())?;
    let (stt, tts) = voice_providers(&config);
    if config.voice.enabled && stt.is_none() {
        tracing::warn!("voice enabled but OPENAI_API_KEY not set, speech endpoints unavailable");
    }

    let server = ApiServerBuilder::new(pool)
        .port(port.unwrap_or(config.server.port))
        .static_dir(config.server.static_dir.clone())
        .voice(config.voice.enabled, stt, tts)
        .rate_limit(config.server.rate_limit_rpm)
        .build();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

/// Run listening sessions, one per Enter press, until `q`, end of input or Ctrl-C at the prompt
async fn listen(email: &str, kitchen_id: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load(false);
    let pool = db::init(config.db_path())?;

    let user = UserRepo::new(pool.clone())
        .find_by_email(email)?
        .ok_or_else(|| anyhow::anyhow!("no account for {email}, sign in once first"))?;

    let kitchens = KitchenRepo::new(pool.clone());
    let kitchen = match kitchen_id {
        Some(id) => kitchens.get(&user.id, id)?,
        None => kitchens.selected(&user.id)?,
    };

    let (stt, tts) = voice_providers(&config);
    let stt = stt.ok_or_else(|| anyhow::anyhow!("speech-to-text needs OPENAI_API_KEY"))?;

    let handle = Handle::current();
    let feedback: Arc<dyn Feedback> = match tts {
        Some(tts) => Arc::new(SpokenFeedback::new(handle.clone(), tts)),
        None => Arc::new(TracingFeedback),
    };

    let processor = CommandProcessor::new(KitchenStore::new(&pool, &kitchen.id), feedback.clone());
    let mut controller = VoiceController::new(
        Box::new(CpalMicrophone),
        Box::new(WhisperTranscriber::new(handle, stt)),
        Box::new(processor),
        feedback,
        config.voice.session(),
    );

    let interrupts = Arc::new(Interrupts::default());
    let sessions = Arc::clone(&interrupts);
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel();

    println!("Adding to \"{}\". Press Enter to speak, q to quit.", kitchen.name);

    // Not spawn_blocking: a pending stdin read would stall runtime shutdown
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim() == "q" {
                break;
            }

            sessions.begin_session();
            if controller.start(Instant::now()) {
                run_until_idle(&mut controller, TICK_INTERVAL, &sessions.cancel);
            }
            sessions.end_session();
        }
        let _ = done_tx.send(());
    });

    loop {
        tokio::select! {
            _ = &mut done_rx => break,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                if interrupts.interrupt() {
                    println!();
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Routes Ctrl-C for `listen`: cancels a running session, quits at the prompt
#[derive(Debug, Default)]
struct Interrupts {
    listening: AtomicBool,
    cancel: AtomicBool,
}

impl Interrupts {
    fn begin_session(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        self.listening.store(true, Ordering::SeqCst);
    }

    fn end_session(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    /// Record a Ctrl-C, returning true when it should quit
    fn interrupt(&self) -> bool {
        if self.listening.load(Ordering::SeqCst) {
            self.cancel.store(true, Ordering::SeqCst);
            false
        } else {
            true
        }
    }
}

/// Print what a command would do
fn parse(text: &str) -> anyhow::Result<()> {
    let interpretation = interpret(text);
    println!("{}", serde_json::to_string_pretty(&interpretation)?);

    let reply = match &interpretation {
        Interpretation::Dispatch(intent) => intent.confirmation(),
        Interpretation::Clarify(clarification) => clarification.prompt(),
    };
    println!("\n{reply}");

    Ok(())
}

/// Test microphone input with the level meter used by listening sessions
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut stream = CpalMicrophone.acquire()?;
    println!("Sample rate: {} Hz", stream.sample_rate());
    println!("---");

    let mut analyser = SpectrumAnalyser::new();
    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = stream.take_samples();
        let rms = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        analyser.push(&samples);
        let level = analyser.normalized_level();
        let meter: String = level_bars(level)
            .iter()
            .map(|bar| if *bar > 0.0 { '#' } else { '.' })
            .collect();

        println!(
            "[{:2}s] RMS: {rms:.4} | Peak: {peak:.4} | level: {level:.3} | [{meter}]",
            i + 1
        );
    }

    stream.release();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If the level stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

fn voice_providers(config: &Config) -> (Option<SpeechToText>, Option<TextToSpeech>) {
    let Some(key) = config.voice_api_key() else {
        return (None, None);
    };

    let stt = SpeechToText::new(key.to_string(), config.voice.stt_model.clone())
        .map_err(|e| tracing::warn!(error = %e, "speech-to-text unavailable"))
        .ok();
    let tts = TextToSpeech::new(
        key.to_string(),
        config.voice.tts_model.clone(),
        config.voice.tts_voice.clone(),
        config.voice.tts_speed,
    )
    .map_err(|e| tracing::warn!(error = %e, "text-to-speech unavailable"))
    .ok();

    (stt, tts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_at_prompt_quits() {
        let interrupts = Interrupts::default();
        assert!(interrupts.interrupt());
        assert!(!interrupts.cancel.load(Ordering::SeqCst));
    }

    #[test]
    fn test_interrupt_cancels_every_session() {
        let interrupts = Interrupts::default();

        for _ in 0..3 {
            interrupts.begin_session();
            assert!(!interrupts.cancel.load(Ordering::SeqCst));

            assert!(!interrupts.interrupt());
            assert!(interrupts.cancel.load(Ordering::SeqCst));
            interrupts.end_session();
        }

        // Back at the prompt
        assert!(interrupts.interrupt());
    }

    #[test]
    fn test_calculate_rms() {
        assert!(calculate_rms(&[]).abs() < f32::EPSILON);
        assert!((calculate_rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
