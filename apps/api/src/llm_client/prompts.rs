// Shared prompt fragments. Each service that calls the LLM keeps its own
// prompts.rs alongside it; only cross-cutting instructions live here.

/// Keeps immigration guidance honest: information, never legal advice.
pub const IMMIGRATION_DISCLAIMER: &str = "\
    You give general immigration information, never legal advice. \
    Do NOT promise approval of any visa. \
    Do NOT invent requirements, fees or processing times you are not sure about. \
    When a decision depends on details you do not have, recommend consulting \
    a licensed U.S. immigration attorney.";

/// Maps a language tag to the instruction the model follows.
pub fn language_instruction(language: &str) -> String {
    let name = match language {
        "pt-BR" | "pt" => "Brazilian Portuguese",
        "en" | "en-US" => "English",
        "es" => "Spanish",
        other => other,
    };
    format!("Write every user-facing string in {name}.")
}
