use serde::{Deserialize, Serialize};

/// Feature label configuration of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelConfig {
    /// Labels are drawn only when enabled.
    pub enabled: bool,
    /// Name of the feature property used as label text.
    pub field: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Font weight.
    pub font_weight: FontWeight,
    /// Text color (CSS string).
    pub font_color: String,
    /// Halo color (CSS string).
    pub halo_color: String,
    /// Halo width in pixels.
    pub halo_width: f64,
    /// Label offset `[x, y]` in pixels.
    pub offset: [f64; 2],
    /// Position of the label relative to the feature anchor point.
    pub anchor: LabelAnchor,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            field: String::new(),
            font_size: 12.0,
            font_weight: FontWeight::Normal,
            font_color: "#000000".into(),
            halo_color: "#ffffff".into(),
            halo_width: 1.0,
            offset: [0.0, 0.0],
            anchor: LabelAnchor::Center,
        }
    }
}

impl LabelConfig {
    /// Creates an enabled label configuration for the given field with default styling.
    pub fn for_field(field: impl Into<String>) -> Self {
        Self {
            enabled: true,
            field: field.into(),
            ..Default::default()
        }
    }

    /// Returns true if labels should be drawn: the config is enabled and has a field.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.field.is_empty()
    }

    /// CSS font string, e.g. `bold 14px sans-serif`.
    pub fn font(&self) -> String {
        format!("{} {}px sans-serif", self.font_weight.as_css(), self.font_size)
    }
}

/// Font weight of a label.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    fn as_css(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
        }
    }
}

/// Position of a label relative to its anchor point.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum LabelAnchor {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Horizontal alignment of text relative to the anchor point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Vertical alignment of text relative to the anchor point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextBaseline {
    Top,
    Middle,
    Bottom,
}

impl LabelAnchor {
    /// Text alignment and baseline produced by the anchor.
    pub fn alignment(&self) -> (TextAlign, TextBaseline) {
        match self {
            Self::Center => (TextAlign::Center, TextBaseline::Middle),
            Self::Top => (TextAlign::Center, TextBaseline::Top),
            Self::Bottom => (TextAlign::Center, TextBaseline::Bottom),
            Self::Left => (TextAlign::Left, TextBaseline::Middle),
            Self::Right => (TextAlign::Right, TextBaseline::Middle),
            Self::TopLeft => (TextAlign::Left, TextBaseline::Top),
            Self::TopRight => (TextAlign::Right, TextBaseline::Top),
            Self::BottomLeft => (TextAlign::Left, TextBaseline::Bottom),
            Self::BottomRight => (TextAlign::Right, TextBaseline::Bottom),
        }
    }
}
