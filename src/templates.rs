//! Fixed catalog of document styling presets.

use serde::Serialize;

pub const DEFAULT_TEMPLATE_ID: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStyle {
    Modern,
    Professional,
    Elegant,
    Warm,
    Corporate,
    Creative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub id: i32,
    pub name: &'static str,
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    pub style: TemplateStyle,
}

impl TemplateDescriptor {
    /// Two-color gradient built from the primary and secondary colors.
    pub fn background(&self) -> String {
        format!(
            "linear-gradient(135deg, {}, {})",
            self.primary_color, self.secondary_color
        )
    }
}

impl Serialize for TemplateDescriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("TemplateDescriptor", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("name", self.name)?;
        s.serialize_field("primary_color", self.primary_color)?;
        s.serialize_field("secondary_color", self.secondary_color)?;
        s.serialize_field("background", &self.background())?;
        s.serialize_field("style", &self.style)?;
        s.end()
    }
}

static CATALOG: [TemplateDescriptor; 6] = [
    TemplateDescriptor {
        id: 1,
        name: "Modern Blue",
        primary_color: "#4361ee",
        secondary_color: "#3a0ca3",
        style: TemplateStyle::Modern,
    },
    TemplateDescriptor {
        id: 2,
        name: "Professional Green",
        primary_color: "#2a9d8f",
        secondary_color: "#264653",
        style: TemplateStyle::Professional,
    },
    TemplateDescriptor {
        id: 3,
        name: "Elegant Purple",
        primary_color: "#7209b7",
        secondary_color: "#3a0ca3",
        style: TemplateStyle::Elegant,
    },
    TemplateDescriptor {
        id: 4,
        name: "Warm Orange",
        primary_color: "#f77f00",
        secondary_color: "#d62828",
        style: TemplateStyle::Warm,
    },
    TemplateDescriptor {
        id: 5,
        name: "Corporate Gray",
        primary_color: "#495057",
        secondary_color: "#212529",
        style: TemplateStyle::Corporate,
    },
    TemplateDescriptor {
        id: 6,
        name: "Creative Pink",
        primary_color: "#f72585",
        secondary_color: "#b5179e",
        style: TemplateStyle::Creative,
    },
];

pub fn all() -> &'static [TemplateDescriptor] {
    &CATALOG
}

pub fn lookup(id: i32) -> Option<&'static TemplateDescriptor> {
    CATALOG.iter().find(|t| t.id == id)
}

/// Never fails: unknown ids fall back to the default template.
pub fn resolve(id: i32) -> &'static TemplateDescriptor {
    lookup(id).unwrap_or(&CATALOG[0])
}

/// Resolves a raw form value; missing or non-numeric input gets the default template.
pub fn resolve_raw(raw: Option<&str>) -> &'static TemplateDescriptor {
    let id = raw
        .and_then(|s| s.trim().parse::<i32>().ok())
        .unwrap_or(DEFAULT_TEMPLATE_ID);
    resolve(id)
}
