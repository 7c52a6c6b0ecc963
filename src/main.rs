use clap::Parser;
use std::path::Path;
use vidlift::adapters::{S3Adapter, YoutubeDl};
use vidlift::application::Pipeline;
use vidlift::config::{self, ConfigError, InitOutcome, Options, RunConfig, APP_NAME};

#[derive(Parser)]
#[command(
    name = APP_NAME,
    version,
    about = "Download videos with youtube-dl and upload them to S3"
)]
struct Cli {
    /// `init` to create a config file, or input items: file paths,
    /// JSON literals, or video URLs/IDs
    inputs: Vec<String>,

    /// With init: overwrite an existing config file
    #[arg(short = 'f', long)]
    force: bool,

    #[command(flatten)]
    options: Options,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if cli.inputs.first().map(String::as_str) == Some("init") {
        run_init(&cli.options, cli.force);
        return;
    }

    let config = match RunConfig::resolve(&cli.options) {
        Ok(config) => config,
        Err(ConfigError::MissingConfigFile(_)) => {
            eprintln!(
                "[{}] Config file not found! Please run \"{} init\"",
                APP_NAME, APP_NAME
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("[{}] {}", APP_NAME, e);
            std::process::exit(1);
        }
    };

    let inputs: Vec<String> = cli
        .inputs
        .iter()
        .filter(|item| !item.is_empty())
        .cloned()
        .collect();

    println!("{}", config.banner());
    println!("- INPUT\n{}", inputs.join("\n"));

    // ambient state for the whole run: youtube-dl writes into the cwd
    if let Err(e) = enter_download_dir(&config.download_dir) {
        eprintln!(
            "[{}] could not enter download dir {}: {}",
            APP_NAME, config.download_dir, e
        );
        std::process::exit(1);
    }

    let storage = S3Adapter::connect(&config).await;
    let ytdl = YoutubeDl::new();
    let pipeline = Pipeline::new(ytdl.clone(), ytdl, storage, config);
    pipeline.run(&inputs).await;
}

fn run_init(options: &Options, force: bool) {
    match config::init_config(options, force) {
        Ok(InitOutcome::Created(path)) => {
            println!("[{}] Config file created: {}", APP_NAME, path.display());
        }
        Ok(InitOutcome::AlreadyExists(_)) => {
            println!(
                "[{}] Config file exist! Please run \"{} init --force\" to overwrite it.",
                APP_NAME, APP_NAME
            );
        }
        Err(e) => {
            eprintln!("[{}] {}", APP_NAME, e);
            std::process::exit(1);
        }
    }
}

fn enter_download_dir(download_dir: &str) -> std::io::Result<()> {
    let path = Path::new(download_dir);
    if !path.is_dir() {
        std::fs::create_dir_all(path)?;
    }
    std::env::set_current_dir(path)
}
