//! `webmind context <query>` — one-shot research.

use webmind_agent::AssembledContext;
use webmind_config::AppConfig;

pub async fn run(
    config: AppConfig,
    query: &str,
    sources: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = super::build_session(&config);
    if let Some(sources) = sources {
        session = session.with_max_sources(sources);
    }

    let assembled = session.research(query).await;
    print(&assembled);
    Ok(())
}

pub fn print(assembled: &AssembledContext) {
    if assembled.is_empty() {
        println!("  No context found.");
    } else {
        println!("{}", assembled.context);
    }

    println!();
    println!(
        "  ~{} tokens{}",
        assembled.estimated_tokens,
        if assembled.truncated { " (truncated)" } else { "" }
    );
    for source in &assembled.ranked {
        println!("  ✅ {:.2}  {} ({})", source.score, source.source_id, source.kind);
    }
    for exclusion in &assembled.exclusions {
        println!("  ❌ {} — {}", exclusion.source_id, exclusion.reason);
    }
}
