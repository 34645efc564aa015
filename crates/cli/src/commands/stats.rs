//! `lexiscope stats` and `lexiscope lessons`: loaded-state inspection.

use super::open_session;
use crate::SessionArgs;

pub async fn run(session: &SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_session(session).await?;
    let stats = engine.stats().await;

    println!("📚 Lexiscope Session");
    println!("====================");
    println!("  Session:     {}", stats.session_id);
    println!("  Avatar:      {}", stats.avatar_id);
    println!(
        "  Topic:       {} rules, {} vocabulary, {} mistakes ({} sources)",
        stats.topic.grammar_rules,
        stats.topic.vocabulary_entries,
        stats.topic.mistake_patterns,
        stats.topic.sources
    );
    println!(
        "  General:     {} rules, {} vocabulary, {} mistakes ({} sources)",
        stats.general.grammar_rules,
        stats.general.vocabulary_entries,
        stats.general.mistake_patterns,
        stats.general.sources
    );
    println!("  Lessons:     {}", stats.curriculum_units);
    let dropped = stats.topic.dropped_patterns + stats.general.dropped_patterns;
    if dropped > 0 {
        println!("\n  ⚠️  {dropped} mistake patterns failed to compile and were dropped");
    }
    println!();
    println!("{}", stats.to_json()?);
    Ok(())
}

pub async fn lessons(session: &SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_session(session).await?;
    println!("{}", engine.curriculum_summary());
    Ok(())
}
