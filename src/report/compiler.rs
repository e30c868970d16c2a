//! Report Compiler: joins finished sections into one markdown document.

use super::types::Section;
use crate::constants::report::SECTION_SEPARATOR;

pub struct ReportCompiler;

impl ReportCompiler {
    /// Concatenate sections in plan order.
    ///
    /// Content that does not open with a heading gets a `## name` heading so
    /// every section stays addressable in the output.
    pub fn compile(sections: &[Section]) -> String {
        sections
            .iter()
            .map(Self::render)
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR)
    }

    fn render(section: &Section) -> String {
        let content = section.content.trim();
        if content.starts_with('#') {
            content.to_string()
        } else if content.is_empty() {
            format!("## {}", section.name)
        } else {
            format!("## {}\n\n{}", section.name, content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(name: &str, content: &str) -> Section {
        let mut section = Section::new(name, "", true);
        section.content = content.to_string();
        section
    }

    #[test]
    fn test_compile_keeps_order_and_headings() {
        let doc = ReportCompiler::compile(&[
            written("Intro", "# Report\n\nOverview"),
            written("Body", "Plain text"),
            written("Conclusion", "## Conclusion\n\nDone"),
        ]);

        assert_eq!(
            doc,
            "# Report\n\nOverview\n\n## Body\n\nPlain text\n\n## Conclusion\n\nDone"
        );
    }

    #[test]
    fn test_empty_content_still_yields_heading() {
        let doc = ReportCompiler::compile(&[written("Gap", "  ")]);
        assert_eq!(doc, "## Gap");
    }

    #[test]
    fn test_every_section_present() {
        let sections: Vec<Section> = (0..5)
            .map(|i| written(&format!("S{}", i), &format!("text {}", i)))
            .collect();
        let doc = ReportCompiler::compile(&sections);
        for i in 0..5 {
            assert!(doc.contains(&format!("## S{}", i)));
        }
        assert_eq!(doc.matches("## ").count(), 5);
    }
}
