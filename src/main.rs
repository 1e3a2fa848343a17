use docqa::chunking::{load_document, split_documents, Document};
use docqa::cli::{Cli, Commands, ConfigAction, IndexAction};
use docqa::config::{expand_path, Config, ConfigValidator};
use docqa::embedding::build_provider;
use docqa::error::{DocqaError, Result};
use docqa::index::IndexSnapshot;
use docqa::retrieval::{Retriever, RetrieverSettings, ScoredChunk};
use docqa::session::{Answer, ChatSession};
use docqa::synthesis::AnswerSynthesizer;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    if let Commands::Config { action } = cli.command {
        return cmd_config(cli.config, cli.profile, action);
    }

    let config = load_config(cli.config, cli.profile, cli.sources)?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| DocqaError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;

    runtime.block_on(async {
        match cli.command {
            Commands::Query { query, k, json } => cmd_query(&config, &query, k, json).await,
            Commands::Ask {
                question,
                k,
                offline,
            } => cmd_ask(&config, &question, k, offline).await,
            Commands::Chat { k, offline } => cmd_chat(&config, k, offline).await,
            Commands::Chunks { json } => cmd_chunks(&config, json).await,
            Commands::Index { action } => cmd_index(&config, action).await,
            Commands::Config { .. } => Ok(()),
        }
    })
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose { "docqa=debug" } else { "docqa=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_retriever(config: &Config, settings: RetrieverSettings) -> Result<Retriever> {
    let embedding = config.embedding.clone();
    let provider = tokio::task::spawn_blocking(move || build_provider(&embedding))
        .await
        .map_err(|e| DocqaError::Config(format!("Embedding setup task failed: {}", e)))??;

    Ok(Retriever::new(provider, settings))
}

async fn load_retriever(config: &Config) -> Result<Retriever> {
    let retriever = open_retriever(config, RetrieverSettings::from_config(config)?).await?;
    retriever
        .load_all(&config.document.sources, config.chunking.params()?)
        .await?;
    Ok(retriever)
}

async fn cmd_query(config: &Config, query: &str, k: Option<usize>, json: bool) -> Result<()> {
    let retriever = load_retriever(config).await?;
    let results = retriever
        .query(query, k.unwrap_or(config.retrieval.k))
        .await?;

    if json {
        println!("{}", to_json(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No chunks indexed.");
        return Ok(());
    }

    for result in &results {
        print_source_chunk(result);
    }

    Ok(())
}

async fn cmd_ask(config: &Config, question: &str, k: Option<usize>, offline: bool) -> Result<()> {
    let mut session = open_session(config, k, offline).await?;
    let answer = session.ask(question).await?;
    print_answer(&answer);
    Ok(())
}

async fn cmd_chat(config: &Config, k: Option<usize>, offline: bool) -> Result<()> {
    use std::io::Write;
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut session = open_session(config, k, offline).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("docqa chat (session {})", session.id());
    println!("Type a question, 'clear' to forget the conversation, or 'exit' to quit.");

    loop {
        print!("\n> ");
        std::io::stdout().flush().ok();

        let line = match lines.next_line().await.map_err(|e| DocqaError::Io {
            source: e,
            context: "Failed to read from stdin".to_string(),
        })? {
            Some(line) => line,
            None => break,
        };

        let question = line.trim();
        match question {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                session.clear();
                println!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        match session.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) if e.is_retryable() => eprintln!("Error: {} (try again)", e),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

async fn cmd_chunks(config: &Config, json: bool) -> Result<()> {
    let documents = read_documents(config).await?;
    let chunks = split_documents(&documents, &config.chunking.params()?);

    if json {
        println!("{}", to_json(&chunks)?);
        return Ok(());
    }

    for chunk in &chunks {
        println!(
            "── {} #{} [{}..{}) overlap {} ──",
            chunk.source, chunk.ordinal, chunk.start, chunk.end, chunk.overlap
        );
        println!("{}\n", chunk.text);
    }
    println!(
        "{} chunks from {} document(s) (size {}, overlap {})",
        chunks.len(),
        documents.len(),
        config.chunking.chunk_size,
        config.chunking.overlap
    );

    Ok(())
}

async fn cmd_index(config: &Config, action: IndexAction) -> Result<()> {
    match action {
        IndexAction::Build { output } => {
            let path = match output {
                Some(path) => expand_path(&path)?,
                None => snapshot_path(config)?,
            };
            // Written explicitly below so a failed write is reported
            let settings = RetrieverSettings {
                snapshot_path: None,
                ..RetrieverSettings::from_config(config)?
            };
            let params = config.chunking.params()?;

            let retriever = open_retriever(config, settings).await?;
            let documents = read_documents(config).await?;
            let expected = retriever.expected_manifest(&documents, params);
            let up_to_date = path.exists()
                && IndexSnapshot::read(&path)
                    .map(|snapshot| snapshot.check_compatible(&expected).is_ok())
                    .unwrap_or(false);

            if up_to_date {
                println!("✓ Snapshot is up to date: {}", path.display());
                println!("  Model: {}", expected.embedding_model);
                return Ok(());
            }

            let ready = retriever
                .load_all(&config.document.sources, params)
                .await?;
            ready.save_snapshot(&path)?;

            println!("✓ Index built: {}", path.display());
            println!("  Entries: {}", ready.len());
            println!("  Model: {}", ready.manifest().embedding_model);
            println!("  Strategy: {}", ready.index().strategy().as_str());
        }
        IndexAction::Status => {
            let path = snapshot_path(config)?;
            if !path.exists() {
                println!("No snapshot at {}", path.display());
                println!("Run 'docqa index build' to create one.");
                return Ok(());
            }

            let snapshot = IndexSnapshot::read(&path)?;
            println!("Snapshot: {}", path.display());
            println!(
                "  Created: {}",
                snapshot.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Entries: {}", snapshot.entries.len());
            println!(
                "  Model: {} ({}D, {:?})",
                snapshot.manifest.embedding_model,
                snapshot.manifest.dimension,
                snapshot.manifest.metric
            );

            let retriever = open_retriever(config, RetrieverSettings::from_config(config)?).await?;
            let documents = read_documents(config).await?;
            let expected = retriever.expected_manifest(&documents, config.chunking.params()?);
            match snapshot.check_compatible(&expected) {
                Ok(()) => println!("  Status: up to date"),
                Err(e) => println!("  Status: stale ({})", e),
            }
        }
    }

    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile, Vec::new())?;
            let value = serde_json::to_value(&config).map_err(|e| DocqaError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let shown = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    DocqaError::Config(format!("Unknown config section: {}", section))
                })?,
                None => value,
            };

            println!("{}", to_json(&shown)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Sources: {}", config.document.sources.len());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DocqaError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            // Save default config
            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    sources: Vec<PathBuf>,
) -> Result<Config> {
    let explicit = config_path.is_some();
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = if path.exists() {
        match &profile {
            Some(profile) => Config::load_with_profile(&path, profile)?,
            None => Config::load(&path)?,
        }
    } else if explicit {
        return Err(DocqaError::ConfigNotFound { path });
    } else {
        tracing::warn!(
            "Config file not found, using defaults. Run 'docqa config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = &profile {
            config.apply_profile(profile)?;
        }
        config
    };

    if !sources.is_empty() {
        config.document.sources = sources;
    }
    config.document.sources = config
        .document
        .sources
        .iter()
        .map(|source| expand_path(source))
        .collect::<Result<_>>()?;

    ConfigValidator::validate(&config)?;
    Ok(config)
}

async fn open_session(config: &Config, k: Option<usize>, offline: bool) -> Result<ChatSession> {
    let retriever = load_retriever(config).await?;

    let synthesizer = if config.llm.enabled && !offline {
        let synthesizer = AnswerSynthesizer::from_config(&config.llm)?;
        tracing::info!("Answering with {}", synthesizer.model_name());
        Some(Arc::new(synthesizer))
    } else {
        None
    };

    Ok(ChatSession::new(
        Arc::new(retriever),
        synthesizer,
        k.unwrap_or(config.retrieval.k),
    )
    .with_degrade_to_retrieval(config.llm.degrade_to_retrieval))
}

async fn read_documents(config: &Config) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(config.document.sources.len());
    for source in &config.document.sources {
        documents.push(load_document(source).await?);
    }
    Ok(documents)
}

fn snapshot_path(config: &Config) -> Result<PathBuf> {
    match &config.index.snapshot_path {
        Some(path) => expand_path(path),
        None => Ok(Config::default_data_dir()?.join("index.snapshot")),
    }
}

fn print_answer(answer: &Answer) {
    if let Some(text) = &answer.answer {
        println!("{}\n", text.trim());
    } else if answer.degraded {
        println!(
            "⚠ Answer generation failed ({}); showing retrieved context only.\n",
            answer.error.as_deref().unwrap_or("unknown error")
        );
    }

    if answer.sources.is_empty() {
        println!("No relevant chunks found.");
        return;
    }

    for source in &answer.sources {
        print_source_chunk(source);
    }
}

fn print_source_chunk(result: &ScoredChunk) {
    let (start, end) = result.span();
    println!(
        "Source Chunk {} (score {:.3}, {} [{}..{}))",
        result.rank + 1,
        result.score,
        result.source(),
        start,
        end
    );
    println!("  {}\n", result.text().replace('\n', "\n  "));
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| DocqaError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })
}
