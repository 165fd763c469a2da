use crate::models::{HistoryEntry, QueryResult};

pub const DIVIDER: &str = "---";

/// Where the orchestrator sends everything the user should see.
pub trait Reporter {
    /// Announces a stage before its call is issued.
    fn progress(&mut self, message: &str);
    fn success(&mut self, message: &str);
    fn failure(&mut self, message: &str);
    /// A rendered result section.
    fn block(&mut self, heading: &str, body: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    Progress(String),
    Success(String),
    Failure(String),
    Block { heading: String, body: String },
}

/// Keeps every reported line in memory, in order.
#[derive(Debug, Default)]
pub struct Transcript {
    pub lines: Vec<ReportLine>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                ReportLine::Failure(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Body of the first block reported under `heading`.
    pub fn section(&self, heading: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            ReportLine::Block { heading: h, body } if h == heading => Some(body.as_str()),
            _ => None,
        })
    }
}

impl Reporter for Transcript {
    fn progress(&mut self, message: &str) {
        self.lines.push(ReportLine::Progress(message.to_string()));
    }

    fn success(&mut self, message: &str) {
        self.lines.push(ReportLine::Success(message.to_string()));
    }

    fn failure(&mut self, message: &str) {
        self.lines.push(ReportLine::Failure(message.to_string()));
    }

    fn block(&mut self, heading: &str, body: &str) {
        self.lines.push(ReportLine::Block {
            heading: heading.to_string(),
            body: body.to_string(),
        });
    }
}

pub fn render_answer(result: &QueryResult) -> String {
    format!("Answer: {}", result.answer.as_deref().unwrap_or("No answer"))
}

/// Documents are numbered from 1 in the order the service returned them.
pub fn render_documents(result: &QueryResult) -> String {
    let mut out = String::new();

    for (i, doc) in result.retrieved_documents.iter().enumerate() {
        out.push_str(&format!(
            "Document {}:\nSource: {}\nContent Preview: {}\n",
            i + 1,
            doc.source.as_deref().unwrap_or("Unknown"),
            doc.content_preview
                .as_deref()
                .unwrap_or("No preview available"),
        ));
    }

    out
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();

    for entry in entries {
        out.push_str(&format!(
            "Timestamp: {}\nQuery: {}\nAnswer: {}\n{}\n",
            entry.timestamp.as_deref().unwrap_or("N/A"),
            entry.query.as_deref().unwrap_or("N/A"),
            entry.answer.as_deref().unwrap_or("N/A"),
            DIVIDER,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetrievedDocument;

    #[test]
    fn renders_answer_and_numbered_documents() {
        let result: QueryResult = serde_json::from_str(
            r#"{"answer": "42", "retrieved_documents": [{"source":"doc1","content_preview":"abc"}]}"#,
        )
        .unwrap();

        assert_eq!(render_answer(&result), "Answer: 42");
        let docs = render_documents(&result);
        assert!(docs.contains("Document 1:"));
        assert!(docs.contains("Source: doc1"));
        assert!(docs.contains("Content Preview: abc"));
    }

    #[test]
    fn missing_document_fields_use_fallbacks() {
        let result = QueryResult {
            answer: None,
            retrieved_documents: vec![
                RetrievedDocument {
                    source: None,
                    content_preview: Some("abc".to_string()),
                },
                RetrievedDocument::default(),
            ],
        };

        assert_eq!(render_answer(&result), "Answer: No answer");
        let docs = render_documents(&result);
        assert!(docs.contains("Document 1:\nSource: Unknown\nContent Preview: abc"));
        assert!(docs.contains("Document 2:\nSource: Unknown\nContent Preview: No preview available"));
    }

    #[test]
    fn history_entries_keep_order_and_dividers() {
        let entries: Vec<HistoryEntry> = serde_json::from_str(
            r#"[
                {"timestamp": "t1", "query": "q1", "answer": "a1"},
                {"timestamp": "t2", "query": "q2"},
                {"answer": "a3"}
            ]"#,
        )
        .unwrap();

        let rendered = render_history(&entries);
        assert_eq!(rendered.matches(DIVIDER).count(), 3);

        let first = rendered.find("q1").unwrap();
        let second = rendered.find("q2").unwrap();
        let third = rendered.find("a3").unwrap();
        assert!(first < second && second < third);
        assert!(rendered.contains("Timestamp: t2\nQuery: q2\nAnswer: N/A"));
        assert!(rendered.contains("Timestamp: N/A\nQuery: N/A\nAnswer: a3"));
    }

    #[test]
    fn transcript_filters_failures() {
        let mut transcript = Transcript::new();
        transcript.progress("checking");
        transcript.failure("broken");
        transcript.block("Heading", "body");

        assert_eq!(transcript.failures(), vec!["broken"]);
        assert_eq!(transcript.section("Heading"), Some("body"));
        assert_eq!(transcript.section("Other"), None);
    }
}
