//! `lexiscope query` and `lexiscope quick`: per-utterance lookups.

use lexiscope_knowledge::ComposeOptions;

use super::open_session;
use crate::SessionArgs;

pub async fn run(
    session: &SessionArgs,
    text: &str,
    options: ComposeOptions,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_session(session).await?;

    if json {
        let ctx = engine.compose(text, &options).await;
        println!("{}", ctx.to_json()?);
        return Ok(());
    }

    let context = engine.get_context_for_query(text, &options).await;
    if context.is_empty() {
        println!("(no relevant knowledge)");
    } else {
        println!("{context}");
    }
    Ok(())
}

pub async fn quick(session: &SessionArgs, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_session(session).await?;
    match engine.quick_answer(text) {
        Some(answer) => println!("{answer}"),
        None => println!("(no quick answer, ask the LLM)"),
    }
    Ok(())
}
