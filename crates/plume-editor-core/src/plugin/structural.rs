use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::dom::style::set_style_property;
use crate::dom::url::validate_href;
use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::insert::{InsertOptions, Placement, insert_structural};
use crate::plugin::CommandParams;
use crate::selection::SelectionRange;
use crate::session::EditorSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    HorizontalRule,
    Image,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAlign {
    Left,
    Right,
    Center,
    #[default]
    None,
}

impl ImageAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageAlign::Left => "left",
            ImageAlign::Right => "right",
            ImageAlign::Center => "center",
            ImageAlign::None => "none",
        }
    }

    fn placement(self) -> Placement {
        match self {
            ImageAlign::Left | ImageAlign::Right => Placement::Floated,
            ImageAlign::Center | ImageAlign::None => Placement::Inline,
        }
    }
}

impl FromStr for ImageAlign {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(ImageAlign::Left),
            "right" => Ok(ImageAlign::Right),
            "center" | "centre" => Ok(ImageAlign::Center),
            "" | "none" => Ok(ImageAlign::None),
            other => Err(EditorError::unsupported(format!("unknown image alignment '{other}'"))),
        }
    }
}

/// Everything needed to build an image frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub align: ImageAlign,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ImageSpec {
    pub fn from_params(params: &CommandParams) -> Result<Self> {
        let src = params
            .option("src")
            .or(params.value_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or(EditorError::unsupported("image source is required"))?;
        let src = validate_href(src)?;
        let link = params
            .option("href")
            .filter(|h| !h.is_empty())
            .map(validate_href)
            .transpose()?;
        let width = params
            .option("width")
            .map(|w| {
                w.trim_end_matches("px")
                    .parse::<u32>()
                    .map_err(|_| EditorError::unsupported(format!("invalid image width '{w}'")))
            })
            .transpose()?;
        Ok(Self {
            src: src.to_owned(),
            alt: params.option("alt").unwrap_or_default().to_owned(),
            align: params.option("align").unwrap_or_default().parse()?,
            width,
            caption: params.option("caption").filter(|c| !c.is_empty()).map(str::to_owned),
            link: link.map(str::to_owned),
        })
    }
}

/// Build a detached `figure.image-frame` for `image`.
pub fn build_image_fragment(doc: &mut Document, image: &ImageSpec) -> NodeId {
    let figure = doc.create_element_with(
        "figure",
        [("class", "image-frame"), ("data-align", image.align.as_str())],
    );
    let img = doc.create_element_with("img", [("src", image.src.as_str()), ("alt", image.alt.as_str())]);
    if let Some(width) = image.width {
        let width = width.to_string();
        doc.set_attr(figure, "data-width", &width);
        set_style_property(doc, figure, "width", &format!("{width}px"));
    }
    match &image.link {
        Some(href) => {
            let link = doc.create_element_with("a", [("href", href.as_str())]);
            doc.append_child(link, img);
            doc.append_child(figure, link);
        }
        None => doc.append_child(figure, img),
    }
    if let Some(caption) = &image.caption {
        let figcaption = doc.create_element("figcaption");
        let text = doc.create_text(caption);
        doc.append_child(figcaption, text);
        doc.append_child(figure, figcaption);
    }
    figure
}

fn build_table(doc: &mut Document, rows: usize, cols: usize) -> NodeId {
    let table = doc.create_element("table");
    let body = doc.create_element("tbody");
    for _ in 0..rows {
        let row = doc.create_element("tr");
        for _ in 0..cols {
            let cell = doc.create_element("td");
            let br = doc.create_element("br");
            doc.append_child(cell, br);
            doc.append_child(row, cell);
        }
        doc.append_child(body, row);
    }
    doc.append_child(table, body);
    table
}

fn dimension(params: &CommandParams, key: &str, default: usize) -> Result<usize> {
    match params.option(key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if (1..=64).contains(&n) => Ok(n),
            _ => Err(EditorError::unsupported(format!("invalid table {key} '{raw}'"))),
        },
    }
}

/// Inserts rules, images and tables through the insertion positioner.
#[derive(Debug, Clone)]
pub struct StructuralInsert {
    kind: InsertKind,
    filler: char,
    continuation: SmolStr,
}

impl StructuralInsert {
    pub fn new(kind: InsertKind, filler: char, continuation: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            filler,
            continuation: continuation.into(),
        }
    }

    pub fn kind(&self) -> InsertKind {
        self.kind
    }

    pub fn execute(&self, session: &mut EditorSession, params: &CommandParams) -> Result<bool> {
        let range = session.range()?;
        let doc = &mut session.doc;
        let (element, placement) = match self.kind {
            InsertKind::HorizontalRule => (doc.create_element("hr"), Placement::Flow),
            InsertKind::Table => {
                let rows = dimension(params, "rows", 2)?;
                let cols = dimension(params, "cols", 2)?;
                (build_table(doc, rows, cols), Placement::Flow)
            }
            InsertKind::Image => {
                let image = ImageSpec::from_params(params)?;
                (build_image_fragment(doc, &image), image.align.placement())
            }
        };
        let options = InsertOptions {
            continuation_tag: &self.continuation,
            filler: self.filler,
        };
        let caret = insert_structural(doc, session.root, &range, element, placement, options)?;
        session.selection.set(SelectionRange::caret(caret));
        Ok(true)
    }
}
