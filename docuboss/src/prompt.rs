//! Contextual prompt assembly
//!
//! Agents are stateless, so every refine/ask call carries its context inline:
//! the plan first, then the working document, then the immediate task. The
//! order is fixed and callers must not rearrange it.

use tracing::debug;

/// Separator placed between prompt sections
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// One labeled block of a contextual prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section<'a> {
    Plan(&'a str),
    Document(&'a str),
    Task(&'a str),
}

impl Section<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            Section::Plan(_) => "Execution Plan",
            Section::Document(_) => "Current Document",
            Section::Task(_) => "Task",
        }
    }

    fn text(&self) -> &str {
        match self {
            Section::Plan(t) | Section::Document(t) | Section::Task(t) => t,
        }
    }

    /// `**Label:**\n<text>`
    pub fn render(&self) -> String {
        format!("**{}:**\n{}", self.label(), self.text())
    }
}

/// Build a contextual prompt from optional plan and document plus a task
///
/// Blank plan or document sections are omitted; the task section is always
/// present and always last.
pub fn compose(task: &str, plan: Option<&str>, document: Option<&str>) -> String {
    debug!(
        task_len = task.len(),
        has_plan = plan.is_some(),
        has_document = document.is_some(),
        "compose: called"
    );
    fn present(text: Option<&str>) -> Option<&str> {
        text.filter(|t| !t.trim().is_empty())
    }

    let mut sections = Vec::with_capacity(3);
    if let Some(plan) = present(plan) {
        sections.push(Section::Plan(plan));
    }
    if let Some(document) = present(document) {
        sections.push(Section::Document(document));
    }
    sections.push(Section::Task(task));

    sections
        .iter()
        .map(Section::render)
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Task text for a refine request
pub fn refine_task(document: &str) -> String {
    format!("refine this text: {}", document)
}
