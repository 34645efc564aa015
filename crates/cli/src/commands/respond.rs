//! `lexiscope respond`: pre-written response lookup.

use super::open_session;
use crate::SessionArgs;

pub async fn run(
    session: &SessionArgs,
    text: &str,
    unit: Option<&str>,
    scope: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_session(session).await?;

    if let Some(unit) = unit {
        let added = engine.load_unit_responses(unit).await;
        if added == 0 {
            println!("⚠️  Unit '{unit}' has no cached responses");
        }
    }

    match engine.lookup_response(text, scope).await {
        Some(hit) => {
            println!("{}", hit.response);
            println!();
            println!(
                "   match: {} (score {:.2}, priority {})",
                hit.kind.as_str(),
                hit.score,
                hit.priority
            );
            if let Some(audio) = &hit.audio_url {
                println!("   audio: {audio}");
            }
        }
        None => println!("(no cached response)"),
    }
    Ok(())
}
