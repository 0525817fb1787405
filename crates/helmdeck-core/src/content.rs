//! Message content and controls as handed to the render surface.

use crate::ids::ControlId;

/// Placeholder replaced with the exclusive-lock holder's mention.
pub const USER_PLACEHOLDER: &str = "${user}";

/// Placeholder replaced with the delay length in seconds.
pub const DELAY_PLACEHOLDER: &str = "${delay}";

/// Rich message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    /// Author line
    pub author: Option<String>,
    /// Title line
    pub title: Option<String>,
    /// Body text. Placeholders are substituted here.
    pub description: Option<String>,
    /// Accent colour (0xRRGGBB)
    pub color: Option<u32>,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Large image URL
    pub image: Option<String>,
}

/// Text or rich content of a message or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain text
    Text(String),
    /// Rich embed
    Embed(Embed),
}

impl Content {
    /// Plain-text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Replace every occurrence of `placeholder` with `value`.
    ///
    /// Applies to plain text and to an embed's description; other embed
    /// fields are left alone.
    pub fn substitute(&self, placeholder: &str, value: &str) -> Self {
        match self {
            Self::Text(text) => Self::Text(text.replace(placeholder, value)),
            Self::Embed(embed) => {
                let mut embed = embed.clone();
                if let Some(description) = embed.description.as_mut() {
                    *description = description.replace(placeholder, value);
                }
                Self::Embed(embed)
            },
        }
    }

    /// The text a plain-text surface would show.
    pub fn plain_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Embed(embed) => {
                embed.description.as_deref().or(embed.title.as_deref()).unwrap_or_default()
            },
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Embed> for Content {
    fn from(embed: Embed) -> Self {
        Self::Embed(embed)
    }
}

/// Visual style of a control. Irrelevant to resolution logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlStyle {
    /// Primary action
    #[default]
    Primary,
    /// Neutral action
    Secondary,
    /// Positive action
    Success,
    /// Destructive or urgent action
    Danger,
}

/// A clickable control as rendered by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Id echoed back in click events
    pub id: ControlId,
    /// Button label
    pub label: String,
    /// Button style
    pub style: ControlStyle,
    /// Rendered but not clickable
    pub disabled: bool,
}

impl Control {
    /// Enabled control with the given id, label and style.
    pub fn new(id: impl Into<ControlId>, label: impl Into<String>, style: ControlStyle) -> Self {
        Self { id: id.into(), label: label.into(), style, disabled: false }
    }
}

/// A message body plus rows of controls.
///
/// Rows map 1:1 to the platform's grid (at most 5 rows of 5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceMessage {
    /// Message body
    pub content: Content,
    /// Grid of controls; empty means no controls
    pub rows: Vec<Vec<Control>>,
}

impl SurfaceMessage {
    /// Message without controls.
    pub fn new(content: impl Into<Content>) -> Self {
        Self { content: content.into(), rows: Vec::new() }
    }

    /// Message with a grid of controls.
    pub fn with_rows(content: impl Into<Content>, rows: Vec<Vec<Control>>) -> Self {
        Self { content: content.into(), rows }
    }

    /// Message with a single row of controls. An empty row renders no
    /// controls.
    pub fn with_row(content: impl Into<Content>, row: Vec<Control>) -> Self {
        let rows = if row.is_empty() { Vec::new() } else { vec![row] };
        Self { content: content.into(), rows }
    }
}
