//! Context rendering and prompt assembly
//!
//! The section order of the generation prompt is a contract, not a
//! formatting nicety: instructions come before context, statute context
//! before precedent context, and the raw scenario before the ruling cue.
//! Reordering these, or dropping the no-external-knowledge constraint,
//! measurably changes model output.

use crate::knowledge::{PrecedentRecord, StatuteRecord};

/// Sentinel context block when the statute search matched nothing.
pub const STATUTE_EMPTY_CONTEXT: &str = "No relevant IPC sections found.";

/// Sentinel context block when the precedent search matched nothing.
pub const PRECEDENT_EMPTY_CONTEXT: &str = "No relevant precedents found.";

/// Answer returned when both searches matched nothing; generation is
/// skipped entirely in that case.
pub const NO_MATCH_ANSWER: &str =
    "No relevant legal content or precedents found in the database for this query.";

/// Render the statute result set as a context block.
///
/// Each record becomes a labeled two-line block; blocks are joined by a
/// blank line. An empty result set yields the fixed sentinel.
pub fn render_statute_context(records: &[StatuteRecord]) -> String {
    if records.is_empty() {
        return STATUTE_EMPTY_CONTEXT.to_string();
    }

    records
        .iter()
        .map(|r| format!("IPC Source: {}\nContent: {}", r.source, r.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the precedent result set as a context block.
pub fn render_precedent_context(records: &[PrecedentRecord]) -> String {
    if records.is_empty() {
        return PRECEDENT_EMPTY_CONTEXT.to_string();
    }

    records
        .iter()
        .map(|r| {
            format!(
                "Case: {} ({})\nSummary: {}",
                r.case_name, r.citation, r.case_summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the full generation prompt.
///
/// Fixed order: persona, numbered response behaviors, statute context,
/// precedent context, the raw user query, ruling cue.
pub fn build_prompt(statute_context: &str, precedent_context: &str, query: &str) -> String {
    format!(
        "You are acting as a legal judge in India. Your task is to analyze a given case \
         scenario based *strictly* on the provided sections of the Indian Penal Code (IPC) \
         and relevant legal precedent summaries.\n\
         \n\
         **Instructions:**\n\
         1. **Identify Relevant Law:** State the applicable IPC section(s) found in the \
         'IPC CONTEXT'.\n\
         2. **Consider Precedents:** Mention any relevant case(s) from the 'RELEVANT \
         PRECEDENTS' section if they apply and explain how they influence the \
         interpretation or decision. If no precedents apply, state that clearly.\n\
         3. **Legal Reasoning:** Explain step-by-step how the law (and precedents, if any) \
         applies to the facts of the 'CASE SCENARIO'. Focus only on the provided context.\n\
         4. **Verdict:** Conclude with a clear judgment (e.g., \"Guilty\", \"Not Guilty\", \
         \"Liable under Section X\").\n\
         5. **Punishment (If applicable):** If the retrieved IPC context specifies a \
         punishment, mention it. If not, state that the punishment details are not \
         available in the provided context.\n\
         6. **Format:** Structure your response like a concise court ruling with clear \
         headings (e.g., **Relevant Law:**, **Precedents Considered:**, **Reasoning:**, \
         **Verdict:**, **Punishment:**). Use markdown bold (**) for headings.\n\
         7. **Constraint:** DO NOT use any external knowledge about the IPC, precedents, \
         or law beyond what is explicitly provided in the context below. If context is \
         insufficient, state that clearly in the reasoning.\n\
         \n\
         **--- IPC CONTEXT ---**\n\
         {statute_context}\n\
         \n\
         **--- RELEVANT PRECEDENTS ---**\n\
         {precedent_context}\n\
         \n\
         **--- CASE SCENARIO ---**\n\
         {query}\n\
         \n\
         **--- YOUR RULING ---**\n"
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn statute(text: &str, source: &str) -> StatuteRecord {
        StatuteRecord {
            text: text.to_string(),
            source: source.to_string(),
        }
    }

    fn precedent(name: &str, citation: &str, summary: &str) -> PrecedentRecord {
        PrecedentRecord {
            case_summary: summary.to_string(),
            case_name: name.to_string(),
            citation: citation.to_string(),
        }
    }

    #[test]
    fn test_statute_context_empty_sentinel() {
        assert_eq!(render_statute_context(&[]), STATUTE_EMPTY_CONTEXT);
    }

    #[test]
    fn test_precedent_context_empty_sentinel() {
        assert_eq!(render_precedent_context(&[]), PRECEDENT_EMPTY_CONTEXT);
    }

    #[test]
    fn test_statute_context_joins_with_blank_line() {
        let records = vec![
            statute("Section 378. Theft.", "ipc.pdf"),
            statute("Section 442. House-trespass.", "ipc.pdf"),
        ];
        let context = render_statute_context(&records);
        assert_eq!(
            context,
            "IPC Source: ipc.pdf\nContent: Section 378. Theft.\n\n\
             IPC Source: ipc.pdf\nContent: Section 442. House-trespass."
        );
    }

    #[test]
    fn test_precedent_context_format() {
        let records = vec![precedent(
            "State v. Example",
            "AIR 1990 SC 123",
            "The accused entered at night.",
        )];
        let context = render_precedent_context(&records);
        assert_eq!(
            context,
            "Case: State v. Example (AIR 1990 SC 123)\nSummary: The accused entered at night."
        );
    }

    #[test]
    fn test_prompt_section_order_is_fixed() {
        let prompt = build_prompt("STATUTE-BLOCK", "PRECEDENT-BLOCK", "THE-QUERY");

        let instructions = prompt.find("**Instructions:**").unwrap();
        let constraint = prompt.find("DO NOT use any external knowledge").unwrap();
        let statutes = prompt.find("STATUTE-BLOCK").unwrap();
        let precedents = prompt.find("PRECEDENT-BLOCK").unwrap();
        let query = prompt.find("THE-QUERY").unwrap();
        let cue = prompt.find("--- YOUR RULING ---").unwrap();

        assert!(instructions < constraint);
        assert!(constraint < statutes);
        assert!(statutes < precedents);
        assert!(precedents < query);
        assert!(query < cue);
    }
}
