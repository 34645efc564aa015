//! `lexiscope retrieve`: memoized passage search.

use lexiscope_core::format_chunks;

use super::open_session;
use crate::SessionArgs;

pub async fn run(
    session: &SessionArgs,
    text: &str,
    collections: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    if session.bundle.is_none() {
        println!("⚠️  No bundle given, nothing to search (use --bundle or LEXISCOPE_BUNDLE)");
        return Ok(());
    }
    let engine = open_session(session).await?;

    let chunks = engine.retrieve(text, collections).await;
    if chunks.is_empty() {
        println!("(no matching passages)");
        return Ok(());
    }
    println!("{}", format_chunks(&chunks));
    println!();
    for chunk in &chunks {
        println!("   {:.2}  {}", chunk.score, chunk.source);
    }
    Ok(())
}
