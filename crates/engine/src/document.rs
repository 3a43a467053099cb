use serde::Serialize;
use std::fmt;

use crate::html::{self, ScannedControl, Tag};
use crate::{EngineError, Result};

// ============================================================================
// Control Model
// ============================================================================

/// Position of a control in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ControlId(pub usize);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// `<input>`; the type is lowercased and defaults to `text`
    Input { input_type: String },
    Textarea,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormControl {
    pub id: ControlId,
    pub kind: ControlKind,
    pub name: Option<String>,
    pub value: String,
}

impl FormControl {
    /// Whether assigning a string to `value` means anything for this control.
    /// File inputs ignore programmatic values, so they never take part in a fill.
    pub fn accepts_text(&self) -> bool {
        match &self.kind {
            ControlKind::Input { input_type } => input_type != "file",
            ControlKind::Textarea => true,
        }
    }

    fn name_contains(&self, needle_lower: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(needle_lower))
    }
}

/// Observable change made to the document, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomMutation {
    ValueSet {
        control: ControlId,
        value: String,
    },
    Event {
        control: ControlId,
        event: String,
        bubbles: bool,
    },
}

// ============================================================================
// Form Surface Trait
// ============================================================================

/// The slice of a page the fill engine needs
///
/// Implementations can wrap any DOM; [`FormDocument`] is the in-memory one.
pub trait FormSurface {
    /// First `input`/`textarea`, in document order, whose `name` contains
    /// `needle` case-insensitively and which accepts a text value
    fn find_by_name(&self, needle: &str) -> Option<ControlId>;

    /// Assign the control's value
    fn set_value(&mut self, id: ControlId, value: &str) -> Result<()>;

    /// Fire a bubbling `change` event at the control so page scripts notice
    fn dispatch_change(&mut self, id: ControlId) -> Result<()>;
}

// ============================================================================
// In-Memory Document
// ============================================================================

/// Form controls of one page plus a journal of what was done to them
#[derive(Debug, Clone, Default)]
pub struct FormDocument {
    controls: Vec<FormControl>,
    journal: Vec<DomMutation>,
    markup: Option<Markup>,
}

#[derive(Debug, Clone)]
struct Markup {
    source: String,
    scanned: Vec<ScannedControl>,
}

impl FormDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from page markup
    pub fn parse_html(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let scanned = html::scan_controls(&source)?;

        let controls = scanned
            .iter()
            .enumerate()
            .map(|(index, control)| {
                let kind = match control.tag {
                    Tag::Input => ControlKind::Input {
                        input_type: control
                            .attr("type")
                            .filter(|t| !t.is_empty())
                            .unwrap_or("text")
                            .to_ascii_lowercase(),
                    },
                    Tag::Textarea => ControlKind::Textarea,
                };
                let value = match control.tag {
                    Tag::Input => control.attr("value").unwrap_or_default().to_string(),
                    Tag::Textarea => control.text.clone().unwrap_or_default(),
                };
                FormControl {
                    id: ControlId(index),
                    kind,
                    name: control.attr("name").map(str::to_string),
                    value,
                }
            })
            .collect();

        tracing::debug!(controls = scanned.len(), "parsed form document");

        Ok(Self {
            controls,
            journal: Vec::new(),
            markup: Some(Markup { source, scanned }),
        })
    }

    /// Append an `<input>` of the given type
    pub fn push_input(&mut self, name: &str, input_type: &str) -> ControlId {
        self.push(
            ControlKind::Input {
                input_type: input_type.to_ascii_lowercase(),
            },
            name,
        )
    }

    /// Append a `<textarea>`
    pub fn push_textarea(&mut self, name: &str) -> ControlId {
        self.push(ControlKind::Textarea, name)
    }

    fn push(&mut self, kind: ControlKind, name: &str) -> ControlId {
        let id = ControlId(self.controls.len());
        self.controls.push(FormControl {
            id,
            kind,
            name: Some(name.to_string()),
            value: String::new(),
        });
        id
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    pub fn control(&self, id: ControlId) -> Option<&FormControl> {
        self.controls.get(id.0)
    }

    /// Current value of the first control with exactly this name
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.controls
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .map(|c| c.value.as_str())
    }

    pub fn journal(&self) -> &[DomMutation] {
        &self.journal
    }

    /// Whether anything has been written since the document was built
    pub fn is_modified(&self) -> bool {
        self.journal
            .iter()
            .any(|m| matches!(m, DomMutation::ValueSet { .. }))
    }

    /// Serialize the document with current values written into the markup.
    ///
    /// Parsed documents keep everything outside the touched controls byte for
    /// byte. Documents built in code render as a bare list of controls.
    pub fn render_html(&self) -> String {
        let Some(markup) = &self.markup else {
            return self.render_controls();
        };

        let touched: Vec<bool> = {
            let mut flags = vec![false; self.controls.len()];
            for mutation in &self.journal {
                if let DomMutation::ValueSet { control, .. } = mutation {
                    if let Some(flag) = flags.get_mut(control.0) {
                        *flag = true;
                    }
                }
            }
            flags
        };

        let mut out = String::with_capacity(markup.source.len());
        let mut cursor = 0;
        for ((scanned, control), touched) in markup.scanned.iter().zip(&self.controls).zip(touched) {
            if !touched {
                continue;
            }
            out.push_str(&markup.source[cursor..scanned.span.start]);
            match scanned.tag {
                Tag::Input => out.push_str(&html::render_input(scanned, &control.value)),
                Tag::Textarea => out.push_str(&html::render_textarea(scanned, &control.value)),
            }
            cursor = scanned.span.end;
        }
        out.push_str(&markup.source[cursor..]);
        out
    }

    fn render_controls(&self) -> String {
        self.controls
            .iter()
            .map(|control| {
                let name = html::escape(control.name.as_deref().unwrap_or_default());
                let value = html::escape(&control.value);
                match &control.kind {
                    ControlKind::Input { input_type } => format!(
                        "<input type=\"{}\" name=\"{}\" value=\"{}\">\n",
                        html::escape(input_type),
                        name,
                        value
                    ),
                    ControlKind::Textarea => {
                        format!("<textarea name=\"{}\">{}</textarea>\n", name, value)
                    }
                }
            })
            .collect()
    }

    fn control_mut(&mut self, id: ControlId) -> Result<&mut FormControl> {
        self.controls
            .get_mut(id.0)
            .ok_or(EngineError::UnknownControl(id))
    }
}

impl FormSurface for FormDocument {
    fn find_by_name(&self, needle: &str) -> Option<ControlId> {
        let needle = needle.to_lowercase();
        self.controls
            .iter()
            .find(|c| c.accepts_text() && c.name_contains(&needle))
            .map(|c| c.id)
    }

    fn set_value(&mut self, id: ControlId, value: &str) -> Result<()> {
        self.control_mut(id)?.value = value.to_string();
        self.journal.push(DomMutation::ValueSet {
            control: id,
            value: value.to_string(),
        });
        Ok(())
    }

    fn dispatch_change(&mut self, id: ControlId) -> Result<()> {
        self.control_mut(id)?;
        self.journal.push(DomMutation::Event {
            control: id,
            event: "change".to_string(),
            bubbles: true,
        });
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
