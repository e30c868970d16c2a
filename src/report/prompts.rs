//! Stage prompts for planning, research and drafting.
//!
//! Every prompt goes through `PromptBuilder` so stages share one layout.
//! Section-scoped prompts carry a `Section` context line.

use super::types::{Section, Topic};
use crate::ai::PromptBuilder;

/// Queries for the planner's exploratory search pass
pub fn planning_queries(topic: &Topic, report_structure: &str, number_of_queries: usize) -> String {
    PromptBuilder::new()
        .role("research analyst", "scoping technical reports")
        .context_item("Topic", topic.as_str())
        .tagged("report_organization", report_structure)
        .objectives(vec![
            "Generate search queries that will help plan the sections of the report",
            "Cover the topic broadly enough to reveal its main sub-topics",
        ])
        .rules(vec![
            &format!("Return exactly {} queries", number_of_queries),
            "Each query must be specific enough to return authoritative sources",
            "Follow the report organization when choosing what to search for",
        ])
        .build()
}

/// Section plan generation, grounded in the exploratory sources
pub fn plan_sections(
    topic: &Topic,
    report_structure: &str,
    sources: &str,
    feedback: &[String],
) -> String {
    let feedback = feedback
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}", i + 1, f.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    PromptBuilder::new()
        .role("technical writer", "structuring research reports")
        .context_item("Topic", topic.as_str())
        .tagged("report_organization", report_structure)
        .tagged("sources", sources)
        .tagged_opt("feedback", Some(&feedback))
        .objectives(vec![
            "Produce an ordered list of report sections",
            "Give each section a name and a description of the concepts it covers",
            "Mark whether each section needs its own web research",
        ])
        .rules(vec![
            "Section names must be unique",
            "Introduction and conclusion sections do not need research",
            "Main body sections must need research",
            "Avoid overlapping sections; merge related material instead",
            "If feedback is present, revise the plan to address every point",
        ])
        .build()
}

/// Round-one queries for a research section, or regenerated refinement queries
pub fn section_queries(
    topic: &Topic,
    section: &Section,
    number_of_queries: usize,
    previous_draft: Option<&str>,
) -> String {
    PromptBuilder::new()
        .role("research analyst", "targeted web research")
        .context_item("Topic", topic.as_str())
        .context_item("Section", &section.name)
        .tagged("section_topic", &section.description)
        .tagged_opt("previous_draft", previous_draft)
        .objectives(vec![
            "Generate search queries that gather comprehensive information for this section",
            "When a previous draft is present, target what it is missing",
        ])
        .rules(vec![
            &format!("Return at most {} queries", number_of_queries),
            "Include technical terms specific to the section topic",
            "Prefer recent and authoritative sources",
        ])
        .build()
}

/// Draft or revise a research section from its sources
pub fn draft_section(
    topic: &Topic,
    section: &Section,
    sources: &str,
    previous_draft: Option<&str>,
) -> String {
    PromptBuilder::new()
        .role("technical writer", "concise, well-sourced report sections")
        .context_item("Topic", topic.as_str())
        .context_item("Section", &section.name)
        .tagged("section_topic", &section.description)
        .tagged_opt("previous_draft", previous_draft)
        .tagged("sources", sources)
        .objectives(vec![
            "Write the section from the sources",
            "When a previous draft is present, revise and extend it instead of starting over",
        ])
        .rules(vec![
            &format!("Start with the heading '## {}'", section.name),
            "150-200 words of body text, no preamble",
            "Use at most one structural element (a table or a short list) and only if it helps",
            "End with a '### Sources' list of the URLs actually used",
            "Do not invent facts that are not in the sources",
        ])
        .build()
}

/// Grade a draft against its goal
pub fn reflect_section(
    topic: &Topic,
    section: &Section,
    draft: &str,
    number_of_queries: usize,
) -> String {
    PromptBuilder::new()
        .role("research editor", "reviewing report sections for completeness")
        .context_item("Topic", topic.as_str())
        .context_item("Section", &section.name)
        .tagged("section_topic", &section.description)
        .tagged("draft", draft)
        .objectives(vec![
            "Decide whether the draft adequately covers the section topic",
            "If it does not, propose follow-up search queries for the missing information",
        ])
        .rules(vec![
            "grade is 'pass' when the draft meets the section goal, otherwise 'fail'",
            "On 'pass' return an empty follow_up_queries list",
            &format!("On 'fail' return at most {} follow-up queries", number_of_queries),
        ])
        .build()
}

/// Framing section written from the finished body
pub fn final_section(topic: &Topic, section: &Section, report_body: &str) -> String {
    PromptBuilder::new()
        .role("technical writer", "synthesizing report introductions and conclusions")
        .context_item("Topic", topic.as_str())
        .context_item("Section", &section.name)
        .tagged("section_topic", &section.description)
        .tagged("report_body", report_body)
        .objectives(vec!["Write this section using the researched body of the report"])
        .rules(vec![
            &format!("Start with the heading '# {}' for an introduction, otherwise '## {}'", section.name, section.name),
            "Introductions: 50-100 words, no sources section",
            "Conclusions: 100-150 words; at most one table or list that distills the body",
            "Do not introduce facts that are not in the report body",
        ])
        .build()
}

/// Render completed sections as context for framing sections
pub fn format_body<'a>(sections: impl IntoIterator<Item = &'a Section>) -> String {
    sections
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{sep}\nSection {n}: {name}\n{sep}\nDescription:\n{desc}\nContent:\n{content}\n",
                sep = "=".repeat(60),
                n = i + 1,
                name = s.name,
                desc = s.description,
                content = if s.content.is_empty() {
                    "[Not yet written]"
                } else {
                    s.content.as_str()
                }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
