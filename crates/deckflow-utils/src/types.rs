use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString, VariantNames};

/// Workflow stages of a generation session.
///
/// The stable, user-facing stages form a strictly forward sequence:
///
/// ```text
/// Input → OutlineRefine → StyleRefine → Generate → Complete
/// ```
///
/// `Outline` and `Style` are transient: the machine passes through them while
/// the corresponding service call is outstanding and never rests there.
///
/// # Example
///
/// ```rust
/// use deckflow_utils::types::Stage;
///
/// assert_eq!(Stage::OutlineRefine.as_str(), "outline_refine");
/// assert!(Stage::Style.is_transient());
/// assert!(Stage::Input < Stage::Complete);
/// ```
///
/// # Serialization
///
/// `Stage` serializes to its snake_case name, which matches the stage names
/// reported by the remote session endpoint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Collecting raw material before the first outline request.
    Input,
    /// Outline generation in flight (transient).
    Outline,
    /// Outline produced; user may edit, refine or confirm.
    OutlineRefine,
    /// Style generation in flight (transient).
    Style,
    /// Style plan produced; user may refine or confirm.
    StyleRefine,
    /// Page images are being generated.
    Generate,
    /// All pages attempted; per-page regeneration available.
    Complete,
}

impl Stage {
    /// Stable stages in workflow order.
    pub const STABLE: [Stage; 5] = [
        Stage::Input,
        Stage::OutlineRefine,
        Stage::StyleRefine,
        Stage::Generate,
        Stage::Complete,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Outline => "outline",
            Self::OutlineRefine => "outline_refine",
            Self::Style => "style",
            Self::StyleRefine => "style_refine",
            Self::Generate => "generate",
            Self::Complete => "complete",
        }
    }

    /// True for stages that are entered and immediately left.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Outline | Self::Style)
    }

    /// Next stable stage in the forward sequence, if any.
    #[must_use]
    pub const fn next_stable(&self) -> Option<Stage> {
        match self {
            Self::Input | Self::Outline => Some(Self::OutlineRefine),
            Self::OutlineRefine | Self::Style => Some(Self::StyleRefine),
            Self::StyleRefine => Some(Self::Generate),
            Self::Generate => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    /// Whether `self -> to` is a legal machine transition.
    ///
    /// Legal moves are a self-loop on a refine stage, or a single step to
    /// the next stable stage.
    #[must_use]
    pub fn can_transition_to(&self, to: Stage) -> bool {
        if *self == to {
            return matches!(self, Self::OutlineRefine | Self::StyleRefine | Self::Complete);
        }
        self.next_stable() == Some(to)
    }
}

/// Opaque session identifier.
///
/// Generated once per orchestrator and never reused. The format mirrors what
/// the generation service expects: `session_<unix-millis>_<9 random chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "session_{}_{}",
            Utc::now().timestamp_millis(),
            &random[..9]
        ))
    }

    /// Wrap an identifier issued elsewhere (e.g. to inspect an existing session).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a per-page material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaterialKind {
    Image,
    TableFile,
    TableText,
}

impl MaterialKind {
    const IMAGE_EXTENSIONS: [&'static str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];
    const TABLE_EXTENSIONS: [&'static str; 3] = ["xlsx", "xls", "csv"];

    /// Classify an uploadable file by extension.
    ///
    /// Returns `None` for extensions the service does not accept as page material.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if Self::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if Self::TABLE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::TableFile)
        } else {
            None
        }
    }

    /// Normalise the label the service reports for an uploaded material.
    ///
    /// The service says `table` for spreadsheets; anything unknown is treated
    /// as an image, which is what the upload endpoint defaults to.
    #[must_use]
    pub fn from_service_label(label: &str) -> Self {
        match label {
            "table" | "table_file" => Self::TableFile,
            "table_text" => Self::TableText,
            _ => Self::Image,
        }
    }
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Where a rendered page number is placed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PageNumberPosition {
    #[default]
    BottomCenter,
    BottomLeft,
    BottomRight,
    None,
}

/// What an uploaded reference image is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceKind {
    /// Loose visual reference.
    Reference,
    /// Master template the service analyses for colours, fonts and layout.
    Template,
}

/// Rendering settings forwarded to outline generation as `template_settings`.
///
/// Colour and font schemes are opaque JSON objects owned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_scheme: Option<serde_json::Value>,
    #[serde(default = "default_logo_position")]
    pub logo_position: String,
    #[serde(default)]
    pub page_number_position: PageNumberPosition,
    #[serde(default)]
    pub has_logo: bool,
    #[serde(default)]
    pub has_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_richness: Option<String>,
}

fn default_logo_position() -> String {
    "top-right".to_string()
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            color_scheme: None,
            font_scheme: None,
            logo_position: default_logo_position(),
            page_number_position: PageNumberPosition::default(),
            has_logo: false,
            has_template: false,
            quality: None,
            content_richness: None,
        }
    }
}

/// Origin of a configuration value, used for attribution in `deckflow config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value read from an environment variable.
    Env,
    /// Value loaded from the configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl ConfigSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}
