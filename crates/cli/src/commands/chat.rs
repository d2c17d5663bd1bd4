//! `webmind chat` — the interactive session.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use webmind_agent::AgentSession;
use webmind_config::AppConfig;

use super::repl::{HELP, MemoryView, ReplCommand};

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session = super::build_session(&config);

    println!();
    println!("  🧠 webmind v{}", env!("CARGO_PKG_VERSION"));
    println!("  Model: {}", config.model);
    if !session.has_provider() {
        println!("  ⚠️  No API key configured. Tools and memory work; chat is disabled.");
        println!("     Set WEBMIND_API_KEY or add api_key to ~/.webmind/config.toml");
    }
    println!("  Type 'help' for commands, 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("  You > ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ReplCommand::parse(line) {
            ReplCommand::Exit => break,
            command => handle(&session, command).await,
        }
        println!();
    }

    println!("  Goodbye! 👋");
    Ok(())
}

async fn handle(session: &AgentSession, command: ReplCommand) {
    match command {
        ReplCommand::Search(query) => {
            let hits = session.search(&query).await;
            if hits.is_empty() {
                println!("  No results.");
            }
            for (i, hit) in hits.iter().enumerate() {
                println!("  {}. {}", i + 1, hit.title);
                println!("     {}", hit.link);
                if !hit.snippet.is_empty() {
                    println!("     {}", hit.snippet);
                }
            }
        }
        ReplCommand::Browse(url) => match session.browse(&url).await {
            Ok(text) => println!("{text}"),
            Err(e) => println!("  [Error] {e}"),
        },
        ReplCommand::Http(url) => match session.http(&url).await {
            Ok(response) => {
                println!("  Status: {}", response.status_code);
                println!("  Content-Type: {}", response.content_type);
                println!("{}", response.body);
            }
            Err(e) => println!("  [Error] {e}"),
        },
        ReplCommand::Context(query) => {
            let assembled = session.research(&query).await;
            super::context::print(&assembled);
        }
        ReplCommand::Memory(view) => show_memory(session, view).await,
        ReplCommand::Clear => {
            session.clear().await;
            println!("  Memory cleared.");
        }
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Usage(usage) => println!("  Usage: {usage}"),
        ReplCommand::Chat(message) => {
            if !session.has_provider() {
                println!("  [Error] No API key configured.");
                return;
            }
            match session.respond(&message).await {
                Ok(outcome) => {
                    for line in outcome.reply.lines() {
                        println!("  Assistant > {line}");
                    }
                }
                Err(e) => {
                    error!(error = %e, "LLM request failed");
                    println!("  [Error] {e}");
                }
            }
        }
        ReplCommand::Exit => {}
    }
}

async fn show_memory(session: &AgentSession, view: MemoryView) {
    let memory = session.memory();
    match view {
        MemoryView::Stats => {
            let stats = memory.stats().await;
            println!("  Conversation turns: {}", stats.conversations);
            println!("  Tool records:       {}", stats.tools);
            println!("  Indexed texts:      {}", stats.indexed);
            println!("  Max history:        {}", stats.max_history);
        }
        MemoryView::Documents => {
            for (i, doc) in memory.documents().await.iter().enumerate() {
                println!("  [{i}] {doc}");
            }
        }
        MemoryView::Metadata => {
            for (i, (tag, record)) in memory.metadata().await.iter().enumerate() {
                match record {
                    Some(id) => println!("  [{i}] {tag} (record {id})"),
                    None => println!("  [{i}] {tag}"),
                }
            }
        }
        MemoryView::Tools => {
            for record in memory.tool_records().await {
                println!("  {} {}", record.timestamp.format("%H:%M:%S"), record.render());
            }
        }
        MemoryView::Messages => {
            for line in memory.recent_conversation(None).await {
                println!("  {line}");
            }
        }
        MemoryView::Search(query) => {
            let results = memory.relevant_context(&query, 5).await;
            if results.is_empty() {
                println!("  Nothing relevant in memory.");
            }
            for (i, text) in results.iter().enumerate() {
                println!("  {}. {text}", i + 1);
            }
        }
    }
}
