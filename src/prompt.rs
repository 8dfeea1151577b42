//! Follow-up prompt construction and completion cleanup

const PREAMBLE: &str = "Below is a Conversation between a human and AI agent. \
Provide the corresponding followup question of the Question and answer provided. ";

/// Markers the model tends to continue with after the follow-up itself
const CONTINUATION_MARKERS: &[&str] = &["Question:", "Answer:"];

/// Build the completion prompt for one answered question
pub fn build_follow_up_prompt(question: &str, answer: &str) -> String {
    format!("{PREAMBLE}Question:{question} \n Answer:{answer}\n FollowUp Question:")
}

/// Reduce raw completion text to the follow-up question alone.
///
/// The text is trimmed, then cut at the earliest marker that does not start
/// it. A marker at position 0 is not a cut point.
pub fn clean_follow_up(raw: &str) -> String {
    let text = raw.trim();

    let cutoff = CONTINUATION_MARKERS
        .iter()
        .filter_map(|marker| text.find(marker).filter(|&i| i > 0))
        .min()
        .unwrap_or(text.len());

    text.get(..cutoff).unwrap_or(text).trim().to_string()
}
