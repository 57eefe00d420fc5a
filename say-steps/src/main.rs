use std::io::{self, Read};

use clap::Parser;
use step_speaks::{
    AudioOutput, HostSynthesizer, HybridRenderer, MethodPreference, QualityPreference,
    QueueOptions, SpeechOrchestrator, SpeedLevel, TtsSettings, Voice,
};

/// Narrate a sequence of steps aloud
///
/// # Examples
///
/// ```no_run
/// // Narrate steps passed as arguments
/// // say-steps "Crack the eggs." "Whisk until smooth."
///
/// // Narrate steps from stdin, one per line
/// // cat recipe.txt | say-steps
/// ```
#[derive(Parser)]
#[command(name = "say-steps")]
#[command(about = "Speak a sequence of steps with hybrid TTS", long_about = None)]
#[command(version)]
struct Cli {
    /// Steps to narrate, in order (reads lines from stdin if not provided)
    steps: Vec<String>,

    /// Voice to use (alloy, echo, fable, onyx, nova, shimmer)
    #[arg(long, default_value = "alloy")]
    voice: String,

    /// Speech rate (fast, slow, normal, or a multiplier like 1.5)
    #[arg(long, default_value = "normal")]
    speed: String,

    /// Synthesis backend preference (remote, local, auto)
    #[arg(long, default_value = "auto")]
    prefer: String,

    /// Output quality (standard, high)
    #[arg(long, default_value = "standard")]
    quality: String,

    /// Skip the audio cache for this run
    #[arg(long)]
    no_cache: bool,
}

/// Parses a speed argument: a named level or a numeric multiplier.
fn parse_speed(value: &str) -> Result<SpeedLevel, String> {
    match value.to_lowercase().as_str() {
        "fast" => Ok(SpeedLevel::Fast),
        "slow" => Ok(SpeedLevel::Slow),
        "normal" => Ok(SpeedLevel::Normal),
        other => other
            .parse::<f32>()
            .map(SpeedLevel::Explicit)
            .map_err(|_| format!("invalid speed '{value}': use fast, slow, normal, or a number")),
    }
}

/// Parses a backend preference argument.
fn parse_method(value: &str) -> Result<MethodPreference, String> {
    match value.to_lowercase().as_str() {
        "remote" => Ok(MethodPreference::Remote),
        "local" => Ok(MethodPreference::Local),
        "auto" => Ok(MethodPreference::Auto),
        other => Err(format!("invalid method '{other}': use remote, local, or auto")),
    }
}

/// Parses a quality argument.
fn parse_quality(value: &str) -> Result<QualityPreference, String> {
    match value.to_lowercase().as_str() {
        "standard" => Ok(QualityPreference::Standard),
        "high" => Ok(QualityPreference::High),
        other => Err(format!("invalid quality '{other}': use standard or high")),
    }
}

/// Reads steps from stdin, one per line, with a 100,000 character limit.
///
/// Blank lines are skipped so recipes with spacing read naturally.
fn read_steps_from_stdin() -> io::Result<Vec<String>> {
    let mut buffer = String::new();
    let mut handle = io::stdin().take(100_000);
    handle.read_to_string(&mut buffer)?;

    Ok(buffer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let voice = Voice::parse(&cli.voice)
        .ok_or_else(|| format!("invalid voice '{}': see --help for the voice list", cli.voice))?;
    let speed = parse_speed(&cli.speed)?;
    let method = parse_method(&cli.prefer)?;
    let quality = parse_quality(&cli.quality)?;

    let steps = if cli.steps.is_empty() {
        read_steps_from_stdin()?
    } else {
        cli.steps
    };

    if steps.is_empty() {
        eprintln!("Error: No steps provided");
        eprintln!("Usage: say-steps <step>... or cat steps.txt | say-steps");
        std::process::exit(1);
    }

    let settings = TtsSettings::default();
    let orchestrator = SpeechOrchestrator::from_settings(settings.clone())?;

    let options = QueueOptions::new()
        .with_voice(voice)
        .with_speed(speed)
        .with_method(method)
        .with_quality(quality)
        .with_cache(!cli.no_cache);

    let mut queue = orchestrator
        .build_queue(&steps, &options, AudioOutput::new())
        .await?;

    let renderer = HybridRenderer::new(HostSynthesizer::detect(&settings));
    let report = queue.play(&renderer).await?;

    if report.failed > 0 {
        tracing::warn!(
            failed = report.failed,
            total = steps.len(),
            "Some steps could not be narrated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speed_named_levels() {
        assert_eq!(parse_speed("fast").unwrap(), SpeedLevel::Fast);
        assert_eq!(parse_speed("SLOW").unwrap(), SpeedLevel::Slow);
        assert_eq!(parse_speed("normal").unwrap(), SpeedLevel::Normal);
    }

    #[test]
    fn test_parse_speed_numeric() {
        assert_eq!(parse_speed("1.5").unwrap(), SpeedLevel::Explicit(1.5));
        assert_eq!(parse_speed("0.75").unwrap(), SpeedLevel::Explicit(0.75));
    }

    #[test]
    fn test_parse_speed_invalid() {
        assert!(parse_speed("warp").is_err());
        assert!(parse_speed("").is_err());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("remote").unwrap(), MethodPreference::Remote);
        assert_eq!(parse_method("Local").unwrap(), MethodPreference::Local);
        assert_eq!(parse_method("AUTO").unwrap(), MethodPreference::Auto);
        assert!(parse_method("cloud").is_err());
    }

    #[test]
    fn test_parse_quality() {
        assert_eq!(parse_quality("standard").unwrap(), QualityPreference::Standard);
        assert_eq!(parse_quality("HIGH").unwrap(), QualityPreference::High);
        assert!(parse_quality("ultra").is_err());
    }
}
