use clap::{Arg, ArgMatches, Command};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

use videoredact::{dependencies, pipeline};
use videoredact::{
    BufferMode, Config, ConfigBuilder, ConfigFile, FfmpegRunner, ProgressOperation, Result,
    VideoboxClient,
};

fn build_cli() -> Command {
    Command::new("videoredact")
        .about("Removes objectionable scenes from a video file")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Input video file to process")
                .required_unless_present("list-profiles")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("out")
                .value_name("FILE")
                .help("Output video file (defaults to <input>-redacted.<ext>)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .value_name("FLOAT")
                .help("Detection threshold between 0 and 1 (lower is more strict) [default: 0.4]")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("skipframes")
                .long("skipframes")
                .value_name("N")
                .help("Number of frames to skip between extractions")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("skipseconds")
                .long("skipseconds")
                .value_name("N")
                .help("Number of seconds to skip between extractions")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("videobox")
                .long("videobox")
                .value_name("URL")
                .help("Analysis service address [default: http://localhost:8080]"),
        )
        .arg(
            Arg::new("buffer-ms")
                .long("buffer-ms")
                .value_name("MS")
                .help("Padding around each cut in milliseconds [default: 500]")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("buffer-mode")
                .long("buffer-mode")
                .value_name("MODE")
                .help("Which side of a cut the padding applies to")
                .value_parser(["expand_cuts", "expand_keeps"]),
        )
        .arg(
            Arg::new("analysis-timeout")
                .long("analysis-timeout")
                .value_name("SECONDS")
                .help("Give up waiting for the analysis after this many seconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("transcode-timeout")
                .long("transcode-timeout")
                .value_name("SECONDS")
                .help("Kill an ffmpeg run that takes longer than this many seconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .value_name("PATH")
                .help("ffmpeg binary to use [default: ffmpeg]")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (YAML/JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .value_name("NAME")
                .help("Configuration profile to use"),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .help("Disable progress indicators")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-profiles")
                .long("list-profiles")
                .help("List available configuration profiles")
                .action(clap::ArgAction::SetTrue),
        )
}

async fn load_config_file(matches: &ArgMatches) -> Result<Option<ConfigFile>> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => Ok(Some(ConfigFile::load(path).await?)),
        None => Ok(ConfigFile::load_from_default_locations().await),
    }
}

fn parse_config(matches: &ArgMatches, config_file: Option<&ConfigFile>) -> Result<Config> {
    let input_file = matches
        .get_one::<PathBuf>("input")
        .ok_or_else(|| videoredact::error::validation_error("input", "Input file is required"))?
        .clone();

    let mut builder = ConfigBuilder::new().input_file(input_file);

    if let Some(cf) = config_file {
        builder = match matches.get_one::<String>("profile") {
            Some(profile) => cf.apply_profile_to_builder(profile, builder)?,
            None => cf.apply_to_builder(builder)?,
        };
    } else if let Some(profile) = matches.get_one::<String>("profile") {
        builder = ConfigFile::default().apply_profile_to_builder(profile, builder)?;
    }

    if let Some(output) = matches.get_one::<PathBuf>("output") {
        builder = builder.output_file(output.clone());
    }
    if let Some(&threshold) = matches.get_one::<f64>("threshold") {
        builder = builder.threshold(threshold)?;
    }
    if let Some(&frames) = matches.get_one::<u32>("skipframes") {
        builder = builder.skip_frames(frames);
    }
    if let Some(&seconds) = matches.get_one::<u32>("skipseconds") {
        builder = builder.skip_seconds(seconds);
    }
    if let Some(url) = matches.get_one::<String>("videobox") {
        builder = builder.service_url(url.clone());
    }
    if let Some(&buffer) = matches.get_one::<i64>("buffer-ms") {
        builder = builder.buffer_ms(buffer)?;
    }
    if let Some(mode) = matches.get_one::<String>("buffer-mode") {
        builder = builder.buffer_mode(mode.parse::<BufferMode>()?);
    }
    if let Some(&secs) = matches.get_one::<u64>("analysis-timeout") {
        builder = builder.analysis_timeout(Duration::from_secs(secs));
    }
    if let Some(&secs) = matches.get_one::<u64>("transcode-timeout") {
        builder = builder.transcode_timeout(Duration::from_secs(secs));
    }
    if let Some(path) = matches.get_one::<PathBuf>("ffmpeg") {
        builder = builder.ffmpeg_path(path.clone());
    }

    builder.build()
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config_file = load_config_file(matches).await?;

    if matches.get_flag("list-profiles") {
        println!("Available configuration profiles:");
        for (name, description) in config_file.unwrap_or_default().list_profiles() {
            println!("  {}: {}", name, description);
        }
        return Ok(());
    }

    let config = parse_config(matches, config_file.as_ref())?;
    let show_progress = !matches.get_flag("no-progress")
        && config_file.as_ref().and_then(|cf| cf.show_progress).unwrap_or(true);
    debug!("Starting videoredact with config: {:?}", config);

    dependencies::validate_dependencies(&config.ffmpeg_path).await?;

    let service = VideoboxClient::new(&config.service_url);
    let runner = FfmpegRunner::new(config.ffmpeg_path.clone()).with_timeout(config.transcode_timeout);
    let progress = ProgressOperation::new(show_progress);

    let report = pipeline::run(&config, &service, &runner, &progress).await?;

    info!(
        "Removed {} objectionable instance(s), kept {} segment(s)",
        report.objectionable_instances, report.segments
    );
    println!("{}", report.output_file.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let default_filter = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(&matches).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.mp4");
        File::create(&input).unwrap();

        let matches = build_cli()
            .try_get_matches_from([
                "videoredact",
                input.to_str().unwrap(),
                "--threshold",
                "0.1",
                "--skipseconds",
                "2",
                "--buffer-mode",
                "expand_keeps",
            ])
            .unwrap();
        let file = ConfigFile {
            threshold: Some(0.9),
            buffer_ms: Some(300),
            ..Default::default()
        };

        let config = parse_config(&matches, Some(&file)).unwrap();
        assert_eq!(config.threshold, 0.1);
        assert_eq!(config.buffer_ms, 300);
        assert_eq!(config.skip_seconds, Some(2));
        assert_eq!(config.buffer_mode, BufferMode::ExpandKeeps);
    }

    #[test]
    fn test_input_required() {
        assert!(build_cli().try_get_matches_from(["videoredact"]).is_err());
        assert!(build_cli()
            .try_get_matches_from(["videoredact", "--list-profiles"])
            .is_ok());
    }
}
