//! Document templates offered on the input screen

use serde::{Deserialize, Serialize};

/// Kind of document the user wants to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Template {
    PitchDeck,
    Prd,
    TechSpec,
    MarketingCopy,
    BusinessPlan,
    MeetingNotes,
    Other,
}

impl Template {
    pub const ALL: [Template; 7] = [
        Template::PitchDeck,
        Template::Prd,
        Template::TechSpec,
        Template::MarketingCopy,
        Template::BusinessPlan,
        Template::MeetingNotes,
        Template::Other,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Self::PitchDeck => "pitch-deck",
            Self::Prd => "prd",
            Self::TechSpec => "tech-spec",
            Self::MarketingCopy => "marketing-copy",
            Self::BusinessPlan => "business-plan",
            Self::MeetingNotes => "meeting-notes",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PitchDeck => "Pitch Deck",
            Self::Prd => "Product Requirements Document",
            Self::TechSpec => "Technical Specification",
            Self::MarketingCopy => "Marketing Copy",
            Self::BusinessPlan => "Business Plan",
            Self::MeetingNotes => "Meeting Notes",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl std::str::FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.slug() == wanted)
            .ok_or_else(|| format!("Unknown template: {}", s))
    }
}

/// Planning-agent input for a template plus free text
///
/// With a template: `Create a <Label>: <custom>`, trimmed. Without: the
/// custom text as typed. Callers treat a blank result as missing input.
pub fn build_input(template: Option<Template>, custom: &str) -> String {
    match template {
        Some(template) => format!("Create a {}: {}", template.label(), custom)
            .trim()
            .to_string(),
        None => custom.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parse() {
        assert_eq!("prd".parse::<Template>().unwrap(), Template::Prd);
        assert_eq!("Tech-Spec".parse::<Template>().unwrap(), Template::TechSpec);
        assert!("novel".parse::<Template>().is_err());
    }

    #[test]
    fn test_template_display_matches_serde() {
        for template in Template::ALL {
            let json = serde_json::to_string(&template).unwrap();
            assert_eq!(json, format!("\"{}\"", template));
        }
    }

    #[test]
    fn test_build_input_with_template() {
        assert_eq!(
            build_input(Some(Template::PitchDeck), "for a coffee startup"),
            "Create a Pitch Deck: for a coffee startup"
        );
        assert_eq!(
            build_input(Some(Template::MeetingNotes), "  "),
            "Create a Meeting Notes:"
        );
    }

    #[test]
    fn test_build_input_without_template() {
        assert_eq!(build_input(None, "write a haiku"), "write a haiku");
        assert!(build_input(None, "   ").trim().is_empty());
    }
}
