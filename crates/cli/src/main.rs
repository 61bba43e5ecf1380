use clap::{Parser, Subcommand};
use lib::llm::TextGenerator;

#[derive(Parser)]
#[command(name = "gembot")]
#[command(about = "Discord bot that relays !prompt commands to Gemini", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: GEMBOT_CONFIG_PATH or ~/.gembot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the bot: Discord session, prompt dispatcher, and the HTTP facade (POST /gemini).
    Run {
        /// Config file path (default: GEMBOT_CONFIG_PATH or ~/.gembot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one prompt to Gemini and print the generated text.
    Prompt {
        /// Config file path (default: GEMBOT_CONFIG_PATH or ~/.gembot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Prompt text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("gembot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_bot(config, port).await {
                log::error!("gembot failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Prompt { config, text }) => {
            if let Err(e) = run_prompt(config, text.join(" ")).await {
                log::error!("prompt failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_bot(config_path: Option<std::path::PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gembot on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    lib::gateway::run_gateway(config).await
}

async fn run_prompt(config_path: Option<std::path::PathBuf>, prompt: String) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let api_key = lib::config::resolve_gemini_api_key(&config).ok_or_else(|| {
        anyhow::anyhow!("no Gemini API key configured (set GEMINI_API_KEY or gemini.apiKey)")
    })?;
    let client = lib::llm::GeminiClient::new(
        api_key,
        Some(config.gemini.model.clone()),
        Some(config.gemini.base_url.clone()),
    );
    let text = client.generate(&prompt).await?;
    println!("{}", text);
    Ok(())
}
