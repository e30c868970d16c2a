//! Structured output schemas and their decoded shapes.

use serde::Deserialize;
use serde_json::json;

use super::types::Section;
use crate::ai::OutputSchema;

pub const QUERIES: &str = "queries";
pub const SECTIONS: &str = "sections";
pub const FEEDBACK: &str = "feedback";

/// Search queries for one retrieval round
#[derive(Debug, Clone, Deserialize)]
pub struct QueryBatch {
    pub queries: Vec<String>,
}

/// Planner output
#[derive(Debug, Clone, Deserialize)]
pub struct PlannedSections {
    pub sections: Vec<PlannedSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannedSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub research: bool,
}

impl From<PlannedSection> for Section {
    fn from(planned: PlannedSection) -> Self {
        Section::new(planned.name.trim(), planned.description.trim(), planned.research)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Pass,
    Fail,
}

/// Reflector output
#[derive(Debug, Clone, Deserialize)]
pub struct Feedback {
    pub grade: Grade,
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
}

pub fn queries_schema() -> OutputSchema {
    OutputSchema::new(
        QUERIES,
        json!({
            "title": QUERIES,
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "description": "Web search queries, most important first",
                    "items": {"type": "string"}
                }
            },
            "required": ["queries"],
            "additionalProperties": false
        }),
    )
}

pub fn sections_schema() -> OutputSchema {
    OutputSchema::new(
        SECTIONS,
        json!({
            "title": SECTIONS,
            "type": "object",
            "properties": {
                "sections": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string", "description": "Section title"},
                            "description": {
                                "type": "string",
                                "description": "Main topics and concepts the section covers"
                            },
                            "research": {
                                "type": "boolean",
                                "description": "Whether the section needs its own web research"
                            }
                        },
                        "required": ["name", "description", "research"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["sections"],
            "additionalProperties": false
        }),
    )
}

pub fn feedback_schema() -> OutputSchema {
    OutputSchema::new(
        FEEDBACK,
        json!({
            "title": FEEDBACK,
            "type": "object",
            "properties": {
                "grade": {
                    "type": "string",
                    "enum": ["pass", "fail"],
                    "description": "pass if the section meets its goal, fail if it needs more research"
                },
                "follow_up_queries": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Search queries that would fill the gaps; empty on pass"
                }
            },
            "required": ["grade", "follow_up_queries"],
            "additionalProperties": false
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::decode_structured;

    #[test]
    fn test_schema_titles_match_names() {
        for schema in [queries_schema(), sections_schema(), feedback_schema()] {
            assert_eq!(schema.schema["title"], schema.name);
        }
    }

    #[test]
    fn test_decode_feedback() {
        let fb: Feedback =
            decode_structured(r#"{"grade": "fail", "follow_up_queries": ["a", "b"]}"#, FEEDBACK)
                .unwrap();
        assert_eq!(fb.grade, Grade::Fail);
        assert_eq!(fb.follow_up_queries.len(), 2);

        assert!(decode_structured::<Feedback>(r#"{"grade": "maybe"}"#, FEEDBACK).is_err());
    }

    #[test]
    fn test_planned_section_trims() {
        let plan: PlannedSections = decode_structured(
            r#"{"sections": [{"name": " Intro ", "description": " Overview ", "research": false}]}"#,
            SECTIONS,
        )
        .unwrap();
        let section: Section = plan.sections.into_iter().next().unwrap().into();
        assert_eq!(section.name, "Intro");
        assert_eq!(section.description, "Overview");
        assert!(!section.requires_research);
    }
}
