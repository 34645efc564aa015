//! `lexiscope grade`: tolerant answer checking.

use lexiscope_knowledge::grade_answer;

pub fn run(
    expected: &str,
    acceptable: &[String],
    given: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let grade = grade_answer(expected, acceptable, given);

    let verdict = match (grade.correct, grade.exact) {
        (true, true) => "✅ correct",
        (true, false) => "✅ correct (close match)",
        _ => "❌ incorrect",
    };
    println!("{verdict}");
    println!("   expected: {}", grade.expected);
    println!("   quality:  {}/5", grade.quality);
    Ok(())
}
