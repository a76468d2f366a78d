//! Prompt construction: response packing under the context budget and
//! the fixed instruction templates.

use mosaic_core::constants::{EXTRACTION_MAX_THEMES, EXTRACTION_MIN_THEMES, MAX_THEME_NAME_CHARS};

/// Pack responses into a prompt body in insertion order.
///
/// If the batch exceeds the character limit, responses are stride-sampled
/// (every k-th, smallest k that fits) so ordering is preserved and every
/// batch yields a non-empty body.
pub fn pack_responses(responses: &[String], char_limit: usize) -> String {
    let non_blank: Vec<&String> = responses.iter().filter(|r| !r.trim().is_empty()).collect();
    if non_blank.is_empty() {
        return String::new();
    }

    for stride in 1..=non_blank.len() {
        let sampled: Vec<&&String> = non_blank.iter().step_by(stride).collect();
        let packed = render(&sampled);
        if packed.len() <= char_limit {
            return packed;
        }
    }

    // Even a single response overflows: hard-truncate it at a char
    // boundary so the extractor always has something to work with.
    let first = non_blank[0].as_str();
    let mut cut = char_limit.min(first.len());
    while cut > 0 && !first.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("- {}\n", &first[..cut])
}

fn render(sampled: &[&&String]) -> String {
    let mut body = String::new();
    for response in sampled {
        body.push_str("- ");
        body.push_str(response.trim());
        body.push('\n');
    }
    body
}

/// Instruction asking for a strict JSON array of theme proposals.
pub fn extraction_prompt(question: &str, packed_responses: &str) -> String {
    format!(
        "You are analyzing survey responses to the question:\n\
         \"{question}\"\n\n\
         Responses:\n{packed_responses}\n\
         Identify the recurring themes. Return ONLY a JSON array of \
         {EXTRACTION_MIN_THEMES} to {EXTRACTION_MAX_THEMES} objects, each with \
         a \"name\" (at most {MAX_THEME_NAME_CHARS} characters, distinct) and a \
         one-sentence \"description\". Example:\n\
         [{{\"name\": \"Example Theme\", \"description\": \"What this theme covers.\"}}]\n\
         No prose before or after the JSON array."
    )
}

/// Stricter reformatting instruction used after a parse failure.
pub fn strict_reformat_prompt(question: &str, packed_responses: &str) -> String {
    format!(
        "Your previous output could not be parsed. Respond with VALID JSON ONLY.\n\
         Question: \"{question}\"\n\n\
         Responses:\n{packed_responses}\n\
         Output exactly one JSON array, nothing else. Each element must be \
         {{\"name\": string (<= {MAX_THEME_NAME_CHARS} chars), \"description\": string}}. \
         {EXTRACTION_MIN_THEMES} to {EXTRACTION_MAX_THEMES} elements. \
         Do not wrap the array in markdown fences."
    )
}

/// Instruction for refreshing a theme description against new evidence.
pub fn refresh_prompt(name: &str, current_description: &str, packed_responses: &str) -> String {
    format!(
        "The theme \"{name}\" is currently described as:\n\
         \"{current_description}\"\n\n\
         New responses assigned to this theme:\n{packed_responses}\n\
         Write ONE revised sentence describing the theme, faithful to both \
         the current description and the new responses. Return only that \
         sentence, no quotes, no preamble."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_batch_packs_every_response() {
        let responses = vec!["first answer".to_string(), "second answer".to_string()];
        let packed = pack_responses(&responses, 12_000);
        assert!(packed.contains("first answer"));
        assert!(packed.contains("second answer"));
    }

    #[test]
    fn blank_responses_are_skipped() {
        let responses = vec!["".to_string(), "  ".to_string(), "real".to_string()];
        let packed = pack_responses(&responses, 12_000);
        assert_eq!(packed, "- real\n");
    }

    #[test]
    fn all_blank_packs_empty() {
        let responses = vec!["".to_string(), "   ".to_string()];
        assert!(pack_responses(&responses, 12_000).is_empty());
    }

    #[test]
    fn oversized_batch_is_stride_sampled_in_order() {
        let responses: Vec<String> = (0..100).map(|i| format!("response number {i:03}")).collect();
        let packed = pack_responses(&responses, 500);
        assert!(packed.len() <= 500);
        assert!(packed.contains("response number 000"));
        // Sampled lines appear in their original order.
        let positions: Vec<usize> = (0..100)
            .filter_map(|i| packed.find(&format!("response number {i:03}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(positions.len() > 1, "stride sampling kept several responses");
    }

    #[test]
    fn packing_is_deterministic() {
        let responses: Vec<String> = (0..50).map(|i| format!("resp {i}")).collect();
        assert_eq!(pack_responses(&responses, 200), pack_responses(&responses, 200));
    }

    #[test]
    fn single_giant_response_is_truncated() {
        let responses = vec!["x".repeat(50_000)];
        let packed = pack_responses(&responses, 1000);
        assert!(!packed.is_empty());
        assert!(packed.len() <= 1003); // "- " + cut + "\n"
    }

    #[test]
    fn prompts_embed_question_and_body() {
        let prompt = extraction_prompt("What frustrates you?", "- slow builds\n");
        assert!(prompt.contains("What frustrates you?"));
        assert!(prompt.contains("slow builds"));
        assert!(prompt.contains("JSON array"));
    }
}
