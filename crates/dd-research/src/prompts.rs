//! Prompt builders for each language-model call in a session.

/// Turns the raw user request into a one-line search query.
pub fn initial_query_prompt(user_request: &str) -> String {
    format!(
        "{}\n\nsummarize this input in one line to search in google",
        user_request
    )
}

/// Asks for the key points of this round's page text.
pub fn extraction_prompt(raw_text: &str, user_request: &str) -> String {
    format!(
        r#"Do not exceed 50000 tokens in the response.

<data>
{raw_text}
</data>

<user_input>
{user_request}
</user_input>

<task>
Analyze the provided data to extract and summarize all key points relevant to the user's request.
</task>

<instructions>
- Ensure the summary is concise and directly addresses the user's needs.
- Maintain clarity and coherence in the summary.
</instructions>"#
    )
}

/// Asks for the next search query given everything learned so far.
///
/// `findings` are joined with `"\n ; "` and `history` with `"; "`.
pub fn next_query_prompt(findings: &[&str], user_request: &str, history: &[&str]) -> String {
    let findings = findings.join("\n ; ");
    let history = history.join("; ");
    format!(
        r#"Generate a Google search query based on the following data:
{findings}
, to get a best result for user needs.
Return only the query without any explanations or additional text.

<user>
{user_request}
</user>

<task>
Analyze the provided data and user input to generate a unique and effective search query that addresses the user's needs. Ensure this query is distinct from previous searches to avoid redundancy.
</task>

<search_history>
{history}
</search_history>

<techniques>
- **Chain-of-Thought (CoT) Prompting**: Break down the analysis into a series of reasoning steps to systematically arrive at the search query.
- **Self-Consistency Decoding**: Generate multiple potential search queries and select the one that is most consistent across these iterations.
</techniques>

<instructions>
- Return only the query without any explanations or additional text.
- Develop a concise and precise search query based on the analysis.
- Ensure the new query does not duplicate any listed in the search history.
- Maintain clarity and coherence in the query formulation.
- Adhere to a token limit of <20 word.
</instructions>"#
    )
}

/// Follow-up to [`next_query_prompt`] after it produced a query already searched.
pub fn regenerate_query_prompt(base_prompt: &str, rejected: &str) -> String {
    format!(
        "{base_prompt}\n\nThe query \"{rejected}\" was already searched. Return a different query."
    )
}

/// Combines all findings into the final answer.
pub fn synthesis_prompt(findings: &[&str], user_request: &str) -> String {
    let data = findings.join("; ");
    format!(
        r#"<data>
{data}
</data>

<role>
Act as an academic research expert with an exceptional ability to analyze, synthesize, and extract the most relevant insights from complex data.
</role>

Carefully analyze the provided data, understand its context, and generate the best possible answer that fully satisfies the user's request.
Do not mention or reference the provided data in the response. Present the answer naturally as if it was derived independently.

Also mention the source name or link if necessary to make the answer more valuable

user : {user_request}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_query_prompt() {
        let prompt = initial_query_prompt("latest advances in battery recycling");
        assert!(prompt.starts_with("latest advances in battery recycling"));
        assert!(prompt.ends_with("summarize this input in one line to search in google"));
    }

    #[test]
    fn test_extraction_prompt_sections() {
        let prompt = extraction_prompt("PAGE TEXT", "battery recycling");
        assert!(prompt.contains("Do not exceed 50000 tokens"));
        assert!(prompt.contains("<data>\nPAGE TEXT\n</data>"));
        assert!(prompt.contains("<user_input>\nbattery recycling\n</user_input>"));
        assert!(prompt.contains("extract and summarize all key points"));
    }

    #[test]
    fn test_next_query_prompt_joins() {
        let prompt = next_query_prompt(&["f1", "f2"], "req", &["q1", "q2"]);
        assert!(prompt.contains("f1\n ; f2"));
        assert!(prompt.contains("<search_history>\nq1; q2\n</search_history>"));
        assert!(prompt.contains("<20 word"));
        assert!(prompt.contains("Self-Consistency"));
        assert!(prompt.contains("does not duplicate any listed in the search history"));
    }

    #[test]
    fn test_regenerate_names_rejected_query() {
        let prompt = regenerate_query_prompt("BASE", "old query");
        assert!(prompt.starts_with("BASE"));
        assert!(prompt.contains("\"old query\" was already searched"));
    }

    #[test]
    fn test_synthesis_prompt() {
        let prompt = synthesis_prompt(&["a", "b"], "req");
        assert!(prompt.contains("<data>\na; b\n</data>"));
        assert!(prompt.contains("academic research expert"));
        assert!(prompt.contains("Do not mention or reference the provided data"));
        assert!(prompt.contains("source name or link"));
        assert!(prompt.ends_with("user : req"));
    }

    #[test]
    fn test_synthesis_prompt_empty_findings() {
        let prompt = synthesis_prompt(&[], "req");
        assert!(prompt.contains("<data>\n\n</data>"));
    }
}
