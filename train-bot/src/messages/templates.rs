//! Message templates with named slots.
//!
//! Templates are plain text with `{slot}` placeholders. `{{` and `}}`
//! produce literal braces. Templates are parsed once at startup so an
//! unknown slot is a configuration error, never a failure at send time.

use std::fmt;

use serde::Deserialize;

/// Error returned when a template cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// `{name}` where `name` is not a known slot
    #[error("{template} template: unknown slot {{{slot}}}")]
    UnknownSlot { template: &'static str, slot: String },

    /// A slot that has no value for this kind of message
    #[error("{template} template: slot {{{slot}}} is not available here")]
    SlotNotAllowed {
        template: &'static str,
        slot: &'static str,
    },

    /// `{` without a matching `}`
    #[error("{template} template: unclosed '{{' at byte {position}")]
    Unclosed {
        template: &'static str,
        position: usize,
    },

    /// `}` without a matching `{`
    #[error("{template} template: unmatched '}}' at byte {position}")]
    Unmatched {
        template: &'static str,
        position: usize,
    },
}

/// A substitution point in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Origin,
    Destination,
    Town,
    Url,
    Headcode,
    Time,
}

impl Slot {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "origin" => Some(Slot::Origin),
            "destination" => Some(Slot::Destination),
            "town" => Some(Slot::Town),
            "url" => Some(Slot::Url),
            "headcode" => Some(Slot::Headcode),
            "time" => Some(Slot::Time),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Origin => "origin",
            Slot::Destination => "destination",
            Slot::Town => "town",
            Slot::Url => "url",
            Slot::Headcode => "headcode",
            Slot::Time => "time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Slot(Slot),
}

/// A parsed template.
///
/// ```
/// use train_bot::messages::{Slots, Template};
///
/// let t = Template::parse("passing", "Now passing {town} {{live}}").unwrap();
/// let slots = Slots { town: Some("Cark-in-Cartmel"), ..Slots::default() };
/// assert_eq!(t.render(&slots), "Now passing Cark-in-Cartmel {live}");
///
/// assert!(Template::parse("passing", "Now passing {village}").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    /// Parse template text. `name` identifies the template in errors.
    pub fn parse(name: &'static str, text: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, c)| c) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, c)| c) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let rest = &text[pos + 1..];
                    let end = rest.find('}').ok_or(TemplateError::Unclosed {
                        template: name,
                        position: pos,
                    })?;
                    let slot_name = &rest[..end];
                    let slot = Slot::from_name(slot_name).ok_or_else(|| {
                        TemplateError::UnknownSlot {
                            template: name,
                            slot: slot_name.to_string(),
                        }
                    })?;

                    if !literal.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Slot(slot));

                    // Skip past the slot name and closing brace
                    while let Some(&(p, _)) = chars.peek() {
                        if p > pos + end + 1 {
                            break;
                        }
                        chars.next();
                    }
                }
                '}' => {
                    return Err(TemplateError::Unmatched {
                        template: name,
                        position: pos,
                    });
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Text(literal));
        }

        Ok(Self { parts })
    }

    /// True if the template contains the given slot.
    pub fn uses(&self, slot: Slot) -> bool {
        self.parts.iter().any(|p| *p == Part::Slot(slot))
    }

    /// Substitute slot values. Absent optional values render as empty.
    pub fn render(&self, slots: &Slots<'_>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Slot(slot) => out.push_str(slots.value(*slot)),
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Text(text) => f.write_str(&text.replace('{', "{{").replace('}', "}}"))?,
                Part::Slot(slot) => write!(f, "{{{}}}", slot.name())?,
            }
        }
        Ok(())
    }
}

/// Values for one rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Slots<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub town: Option<&'a str>,
    pub url: &'a str,
    pub headcode: Option<&'a str>,
    pub time: &'a str,
}

impl Slots<'_> {
    fn value(&self, slot: Slot) -> &str {
        match slot {
            Slot::Origin => self.origin,
            Slot::Destination => self.destination,
            Slot::Town => self.town.unwrap_or_default(),
            Slot::Url => self.url,
            Slot::Headcode => self.headcode.unwrap_or_default(),
            Slot::Time => self.time,
        }
    }
}

/// Template text as configured.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub departure: String,
    pub passing: String,
    pub passing_without_town: String,
    pub arrival: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            departure: "The {time} {origin} to {destination} train is leaving now. Follow it: {url}"
                .to_string(),
            passing: "The {origin} to {destination} train is passing through {town}. {url}"
                .to_string(),
            passing_without_town: "The {origin} to {destination} train is on its way. {url}"
                .to_string(),
            arrival: "The {origin} to {destination} train has arrived. {url}".to_string(),
        }
    }
}

/// The four message templates, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
    pub departure: Template,
    pub passing: Template,
    pub passing_without_town: Template,
    pub arrival: Template,
}

impl MessageTemplates {
    /// Parse configured template text.
    ///
    /// `{town}` is only available in the passing template: the other
    /// messages are not about a town.
    pub fn from_config(config: &TemplateConfig) -> Result<Self, TemplateError> {
        let templates = Self {
            departure: Template::parse("departure", &config.departure)?,
            passing: Template::parse("passing", &config.passing)?,
            passing_without_town: Template::parse(
                "passing_without_town",
                &config.passing_without_town,
            )?,
            arrival: Template::parse("arrival", &config.arrival)?,
        };

        for (name, template) in [
            ("departure", &templates.departure),
            ("passing_without_town", &templates.passing_without_town),
            ("arrival", &templates.arrival),
        ] {
            if template.uses(Slot::Town) {
                return Err(TemplateError::SlotNotAllowed {
                    template: name,
                    slot: Slot::Town.name(),
                });
            }
        }

        Ok(templates)
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::from_config(&TemplateConfig::default())
            .unwrap_or_else(|e| unreachable!("built-in templates are valid: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots() -> Slots<'static> {
        Slots {
            origin: "Lancaster",
            destination: "Barrow-in-Furness",
            town: Some("Cark-in-Cartmel"),
            url: "https://example.org/t",
            headcode: Some("2C47"),
            time: "09:00",
        }
    }

    #[test]
    fn renders_all_slots() {
        let t = Template::parse(
            "passing",
            "{headcode} {time} {origin}-{destination} via {town} {url}",
        )
        .unwrap();
        assert_eq!(
            t.render(&slots()),
            "2C47 09:00 Lancaster-Barrow-in-Furness via Cark-in-Cartmel https://example.org/t"
        );
    }

    #[test]
    fn missing_optional_renders_empty() {
        let t = Template::parse("passing", "[{headcode}]").unwrap();
        let s = Slots {
            headcode: None,
            ..slots()
        };
        assert_eq!(t.render(&s), "[]");
    }

    #[test]
    fn escaped_braces() {
        let t = Template::parse("departure", "{{origin}} is {origin}").unwrap();
        assert_eq!(t.render(&slots()), "{origin} is Lancaster");
    }

    #[test]
    fn plain_text() {
        let t = Template::parse("arrival", "Arrived!").unwrap();
        assert!(!t.uses(Slot::Url));
        assert_eq!(t.render(&slots()), "Arrived!");
    }

    #[test]
    fn non_ascii_text() {
        let t = Template::parse("passing", "Croeso i {town} ½").unwrap();
        assert_eq!(t.render(&slots()), "Croeso i Cark-in-Cartmel ½");
    }

    #[test]
    fn unknown_slot() {
        assert_eq!(
            Template::parse("passing", "near {village}"),
            Err(TemplateError::UnknownSlot {
                template: "passing",
                slot: "village".into()
            })
        );
    }

    #[test]
    fn unclosed_and_unmatched() {
        assert_eq!(
            Template::parse("passing", "abc {town"),
            Err(TemplateError::Unclosed {
                template: "passing",
                position: 4
            })
        );
        assert_eq!(
            Template::parse("passing", "abc }"),
            Err(TemplateError::Unmatched {
                template: "passing",
                position: 4
            })
        );
    }

    #[test]
    fn town_only_in_passing() {
        let config = TemplateConfig {
            arrival: "Arrived in {town}".into(),
            ..TemplateConfig::default()
        };
        assert_eq!(
            MessageTemplates::from_config(&config),
            Err(TemplateError::SlotNotAllowed {
                template: "arrival",
                slot: "town"
            })
        );
    }

    #[test]
    fn defaults_parse() {
        let templates = MessageTemplates::default();
        assert!(templates.passing.uses(Slot::Town));
        assert!(!templates.passing_without_town.uses(Slot::Town));
        assert!(templates.departure.uses(Slot::Url));
    }

    #[test]
    fn display_roundtrips() {
        let text = "{{literal}} {origin} and {url}";
        let t = Template::parse("departure", text).unwrap();
        assert_eq!(t.to_string(), text);
    }
}
