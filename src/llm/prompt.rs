//! Prompt text for the analyze → verify → summarize passes.
//!
//! Answers are meant to be read aloud, so the analysis prompt asks for plain
//! text with spoken-style maths and no markdown.

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const ANALYSIS_INSTRUCTION: &str = "\
You are an AI assistant specialized in analyzing images and providing detailed, accurate answers about them.";

const ANALYSIS_GUIDELINES: &str = "\
Guidelines:
- Be detailed and descriptive in your explanation
- If the answer is not apparent from the image, acknowledge the limitation
- If there are ambiguities, mention them
- Use a conversational, helpful tone
- Focus on providing factual information
- If the question asks for calculations or text extraction, perform them accurately
- IMPORTANT: Format your response as plain text without markdown formatting
- For emphasis, use natural language indicators like \"importantly\" or \"note that\" instead of bold or italics
- For mathematical expressions, write them in a way that can be easily read aloud (e.g., \"x squared plus 2x equals 10\")
- Avoid using special characters like asterisks, underscores, dollar signs, or backticks for formatting";

const VERIFIER_INSTRUCTION: &str = "\
You are a verifier model. Review the following AI-generated response for factual accuracy and clarity.
Return a clear, corrected final answer only, with no commentary or justification.";

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Query sent with an image, built from the user's (possibly spoken) question.
pub fn image_query(query: &str) -> String {
    format!("Analyze this image based on: {query}")
}

/// Initial answer used when no image was uploaded.
pub fn text_only_analysis(query: &str) -> String {
    format!("No image provided. Analyzing text only: {query}")
}

/// Full prompt accompanying the image for the first analysis pass.
///
/// ```rust
/// use multimodal_assistant::llm::prompt::analysis_prompt;
///
/// let prompt = analysis_prompt("How many people are there?");
/// assert!(prompt.contains("answer this question: How many people are there?"));
/// ```
pub fn analysis_prompt(query: &str) -> String {
    format!(
        "{ANALYSIS_INSTRUCTION}\n\nPlease analyze the image and answer this question: {query}\n\n{ANALYSIS_GUIDELINES}\n"
    )
}

/// Second pass: correct the first answer for accuracy and clarity.
pub fn verifier_prompt(initial: &str) -> String {
    format!("{VERIFIER_INSTRUCTION}\n\nResponse:\n{initial}\n")
}

/// Shorten a long answer before it is spoken.
pub fn summary_prompt(text: &str) -> String {
    format!("Summarize this text for audio output, keeping key points:\n{text}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
