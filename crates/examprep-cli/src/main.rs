//! examprep - research-then-quiz study assistant CLI

mod commands;
mod config;
mod credentials;
mod utils;

use clap::Parser;
use examprep_agent::{
    ProviderTransport, ResearchMode, SessionConfig, Transcript, TurnController, TurnObserver,
    TurnOutcome, TurnState,
};
use examprep_search::{SearchConfig, SearchMode, SearchProvider, TavilySearch};
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use credentials::{ConfigKeys, CredentialResolver, MODEL_KEY, SEARCH_KEY, SecretsFile};

const STATUS_LINE: &str = "Researching definitions and preparing a quiz...";
const TOPIC_HINT: &str = "Enter a topic (e.g., 'Operating Systems Deadlocks')...";

/// examprep - explains a topic and quizzes you on it
#[derive(Parser, Debug)]
#[command(name = "examprep")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gemini model to use (default: gemini-2.0-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// How web research reaches the model (prefetch, tool, off)
    #[arg(long)]
    research: Option<ResearchMode>,

    /// Search answer style (results, answer)
    #[arg(long)]
    search_mode: Option<SearchMode>,

    /// Title/snippet pairs per search (3-5)
    #[arg(long)]
    max_results: Option<usize>,

    /// Deployment secrets file (default: .examprep/secrets.toml)
    #[arg(long)]
    secrets: Option<String>,

    /// Run one topic non-interactively and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("examprep=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env loaded: {}", e);
    }

    let cfg = config::Config::load();

    // Merge config with CLI args (CLI takes precedence)
    let model_id = args
        .model
        .or(cfg.model.clone())
        .unwrap_or_else(|| examprep_ai::models::DEFAULT_MODEL_ID.to_string());
    let model = examprep_ai::models::model_or_default(&model_id);
    let research = args.research.or(cfg.research).unwrap_or_default();
    let search_mode = args.search_mode.or(cfg.search_mode).unwrap_or_default();
    let max_results = args
        .max_results
        .or(cfg.max_results)
        .unwrap_or(examprep_search::MIN_RESULTS);

    // Credentials are resolved once, before any client exists
    let resolver = CredentialResolver::new()
        .with(SecretsFile::load(&cfg.secrets_path(args.secrets.as_deref())))
        .with(credentials::process_env())
        .with(ConfigKeys::new(&cfg.api_keys));

    let model_key = resolver.require(&MODEL_KEY).unwrap_or_else(|e| fail(e));
    let search_key = research
        .uses_search()
        .then(|| resolver.require(&SEARCH_KEY).unwrap_or_else(|e| fail(e)));

    let transport = Arc::new(ProviderTransport::google(model_key.expose()));
    let search = search_key.map(|key| {
        let provider: Arc<dyn SearchProvider> = Arc::new(TavilySearch::new(
            key.expose(),
            SearchConfig::new(search_mode, max_results),
        ));
        provider
    });

    let mut session_config = SessionConfig::new(model.clone());
    if let Some(rounds) = cfg.max_tool_rounds {
        session_config.max_tool_rounds = rounds;
    }

    let mut controller = TurnController::new(session_config, transport, research, search);
    let mut transcript = Transcript::new();

    tracing::debug!(
        model = %model.id,
        research = %controller.research(),
        search_mode = %search_mode,
        "Starting"
    );

    // Non-interactive mode
    if let Some(command) = args.command {
        return run_command(&mut controller, &mut transcript, &command).await;
    }

    run_interactive(&mut controller, &mut transcript).await
}

/// Print a fatal startup error and exit
fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(1);
}

/// Prints progress for one turn
struct StatusPrinter {
    echo_topic: bool,
    status_shown: bool,
}

impl StatusPrinter {
    fn new(echo_topic: bool) -> Self {
        Self {
            echo_topic,
            status_shown: false,
        }
    }
}

impl TurnObserver for StatusPrinter {
    fn user_message(&mut self, text: &str) {
        if self.echo_topic {
            println!("examprep> {}", text);
            println!();
        }
    }

    fn state_changed(&mut self, state: TurnState) {
        if matches!(state, TurnState::AwaitingSearch | TurnState::AwaitingModelReply)
            && !self.status_shown
        {
            eprintln!("{}", STATUS_LINE);
            self.status_shown = true;
        }
    }
}

/// Show one outcome; returns false when the turn failed
fn render_outcome(outcome: TurnOutcome) -> bool {
    match outcome {
        TurnOutcome::Reply(reply) => {
            for call in &reply.tool_calls {
                let query = call
                    .arguments
                    .get("query")
                    .and_then(|q| q.as_str())
                    .unwrap_or("");
                let marker = if call.is_error { " (failed)" } else { "" };
                println!(
                    "[{}: {}{}]",
                    call.name,
                    utils::truncate_chars(query, 80),
                    marker
                );
            }
            println!("{}", reply.reply);
            if io::stdout().is_terminal() {
                println!("[{} in, {} out]", reply.usage.input, reply.usage.output);
            }
            true
        }
        TurnOutcome::Failed(failure) => {
            eprintln!("{}", failure.headline());
            if let Some(warning) = failure.warning() {
                eprintln!("{}", warning);
            }
            false
        }
        TurnOutcome::Ignored => true,
    }
}

async fn run_command(
    controller: &mut TurnController,
    transcript: &mut Transcript,
    topic: &str,
) -> anyhow::Result<()> {
    let mut printer = StatusPrinter::new(true);
    let outcome = controller.submit(transcript, topic, &mut printer).await;
    if !render_outcome(outcome) {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive(
    controller: &mut TurnController,
    transcript: &mut Transcript,
) -> anyhow::Result<()> {
    // Show startup info (only if TTY)
    if io::stderr().is_terminal() {
        eprintln!("ExamPrep Concierge");
        eprintln!("Powered by: {}", controller.session().model().id);
        eprintln!("{}", TOPIC_HINT);
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input) {
            match result {
                commands::CommandResult::Clear => {
                    let used = transcript.total_usage();
                    tracing::debug!(turns = transcript.user_turns(), "Clearing chat memory");
                    controller.reset(transcript);
                    println!("Chat memory cleared.");
                    if io::stdout().is_terminal() {
                        println!("[session used {} in, {} out]", used.input, used.output);
                    }
                }
                commands::CommandResult::Exit => {
                    break;
                }
                commands::CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        println!();
        let mut printer = StatusPrinter::new(false);
        let outcome = controller.submit(transcript, input, &mut printer).await;
        render_outcome(outcome);
        println!();
    }

    Ok(())
}
