use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkback::audio::capture::SampleSource;
use talkback::audio::duplex::{MicrophonePort, SpeakerPort};
use talkback::audio::{CpalMicrophone, CpalSpeaker, DuplexArbiter, PLAYBACK_SAMPLE_RATE};
use talkback::{
    ChatClient, ClipStore, Config, GpioLineTrigger, HttpProbe, PollPolicy, SessionOptions,
    SessionRunner, SynthesisClient, TranscriberClient,
};

/// Talkback - push-to-talk voice assistant loop
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Directory for capture artifacts (defaults to the platform data dir)
    #[arg(long, env = "TALKBACK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Synthesize and speak a reply through the full chunking path
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the talkback speech path.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,talkback=info",
        1 => "info,talkback=debug",
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

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.data_dir)?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(&config, duration),
            Command::TestSpeaker => test_speaker().await,
            Command::Say { text } => say(&config, &text).await,
        };
    }

    // Startup failures here are fatal: no storage or no mic means no device
    let store = ClipStore::new(config.clip_dir())?;
    let purged = store.purge_stale()?;
    tracing::debug!(purged, "clip store ready");

    let mic = CpalMicrophone::new(config.audio.sample_rate)?;
    let speaker = CpalSpeaker::new()?;
    let arbiter = DuplexArbiter::new(mic, speaker)?;

    let stt = TranscriberClient::new(
        config.services.stt_url.clone(),
        config.api_keys.stt.clone().unwrap_or_default(),
        config.services.stt_model.clone(),
    )?;
    let llm = ChatClient::new(
        config.services.llm_url.clone(),
        config.api_keys.llm.clone().unwrap_or_default(),
        config.services.llm_model.clone(),
        config.services.system_prompt.clone(),
    )?;
    let synth = SynthesisClient::new(
        config.services.tts_url.clone(),
        config.api_keys.tts.clone().unwrap_or_default(),
        config.speech.tts_model.clone(),
        config.speech.tts_voice.clone(),
        config.speech.tts_speed,
    )?;
    let net = HttpProbe::new(config.services.probe_url.clone())?;

    let trigger = GpioLineTrigger::new(config.trigger.gpio_value_path.clone());
    let opts = SessionOptions::from_config(&config);

    let mut runner = SessionRunner::new(
        arbiter,
        trigger,
        store,
        Box::new(stt),
        Box::new(llm),
        Box::new(synth),
        Box::new(net),
        opts,
    );

    tracing::info!(
        gpio = %config.trigger.gpio_value_path.display(),
        "talkback ready - hold the button to talk"
    );

    tokio::select! {
        result = runner.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}

/// Test microphone input with a level meter
fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut mic = CpalMicrophone::new(config.audio.sample_rate)?;
    mic.bring_up()?;

    let mut block = vec![0i16; config.audio.block_samples];
    let blocks_per_second = config.audio.sample_rate as usize / config.audio.block_samples.max(1);

    for second in 0..duration {
        let mut peak: i16 = 0;
        let mut sum_squares: f64 = 0.0;
        let mut count: usize = 0;

        for _ in 0..blocks_per_second.max(1) {
            let n = mic.read_block(&mut block, Duration::from_millis(150))?;
            for &s in &block[..n] {
                peak = peak.max(s.saturating_abs());
                sum_squares += f64::from(s) * f64::from(s);
            }
            count += n;
        }

        let rms = if count == 0 {
            0.0
        } else {
            (sum_squares / count as f64).sqrt() / f64::from(i16::MAX)
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = ((rms * 100.0).min(50.0)) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {rms:.4} | Peak: {peak:6} | [{meter}]", second + 1);
    }

    mic.tear_down()?;

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working.");
    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut speaker = CpalSpeaker::new()?;
    speaker.bring_up()?;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..PLAYBACK_SAMPLE_RATE * 2)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    speaker.enqueue(&samples)?;

    let drain = PollPolicy {
        max_attempts: 60,
        interval: Duration::from_millis(100),
    };
    talkback::poll_until(&drain, || speaker.is_drained()).await;
    speaker.tear_down()?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");
    Ok(())
}

/// Speak text through the chunked synthesis path
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Speaking: \"{text}\"\n");

    let synth = SynthesisClient::new(
        config.services.tts_url.clone(),
        config.api_keys.tts.clone().unwrap_or_default(),
        config.speech.tts_model.clone(),
        config.speech.tts_voice.clone(),
        config.speech.tts_speed,
    )?;

    let mut speaker = CpalSpeaker::new()?;
    speaker.bring_up()?;

    talkback::speak_reply(
        &synth,
        &mut speaker,
        text,
        config.speech.max_chunk_chars,
        &PollPolicy::default(),
    )
    .await?;

    speaker.tear_down()?;
    println!("Done.");
    Ok(())
}
