//! Footnote reference/content linkage.
//!
//! Each footnote is a pair: a reference marker in the text
//! (`sup.footnote-ref`) and a content entry (`li.footnote-item`) in the
//! footnotes section at the end of the document. Both carry the same
//! `data-footnote-id` and display the same number. The registry lives in the
//! editor session and is the only code that creates, deletes or renumbers
//! pairs.
//!
//! Numbers are contiguous `1..=N`. Deleting a footnote renumbers every
//! surviving pair by the document order of its reference. Pairs broken by
//! outside edits are reported by [`FootnoteRegistry::integrity_report`] but
//! never repaired automatically.

use smol_str::{SmolStr, format_smolstr};

use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::mutate::insert_at_boundary;
use crate::selection::Boundary;

pub const FOOTNOTE_ID_ATTR: &str = "data-footnote-id";
pub const SECTION_ATTR: &str = "data-footnotes";
const REF_CLASS: &str = "footnote-ref";
const ITEM_CLASS: &str = "footnote-item";
const TEXT_CLASS: &str = "footnote-text";
const BACKREF_CLASS: &str = "footnote-backref";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteRecord {
    pub id: SmolStr,
    pub number: usize,
    pub reference: NodeId,
    pub content: NodeId,
    pub text: String,
}

/// A broken pair found by [`FootnoteRegistry::integrity_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Reference marker without a content entry.
    MissingContent(SmolStr),
    /// Content entry without a reference marker.
    MissingReference(SmolStr),
    /// The two sides display different numbers.
    NumberMismatch {
        id: SmolStr,
        reference: Option<usize>,
        content: Option<usize>,
    },
    /// Numbers in reference order are not `1..=N`.
    Gap { expected: usize, found: usize },
}

#[derive(Debug, Clone)]
pub struct FootnoteRegistry {
    records: Vec<FootnoteRecord>,
    prefix: String,
    next_serial: u64,
}

impl Default for FootnoteRegistry {
    fn default() -> Self {
        Self::new("fn")
    }
}

impl FootnoteRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            prefix: prefix.into(),
            next_serial: 1,
        }
    }

    pub fn records(&self) -> &[FootnoteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FootnoteRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// The footnote whose reference or content entry contains `node`.
    pub fn find_at(&self, doc: &Document, node: NodeId) -> Option<&FootnoteRecord> {
        let owner = std::iter::once(node)
            .chain(doc.ancestors(node))
            .find(|&n| doc.has_attr(n, FOOTNOTE_ID_ATTR))?;
        self.get(doc.attr(owner, FOOTNOTE_ID_ATTR)?)
    }

    fn fresh_id(&mut self, doc: &Document, root: NodeId) -> SmolStr {
        loop {
            let id = format_smolstr!("{}-{}", self.prefix, self.next_serial);
            self.next_serial += 1;
            let taken = self.get(&id).is_some()
                || doc.find_by_id_attr(root, &id).is_some()
                || doc.find_by_id_attr(root, &format!("ref-{id}")).is_some();
            if !taken {
                return id;
            }
        }
    }

    /// Create a footnote with its reference at `at`.
    ///
    /// The new footnote is numbered `count + 1`. Returns the record and the
    /// boundary just after the reference marker.
    pub fn create(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        at: Boundary,
        text: &str,
    ) -> Result<(FootnoteRecord, Boundary)> {
        if !doc.contains(root, at.node) {
            return Err(EditorError::InvalidSelection("footnote position is outside the editor root"));
        }
        if section_of(doc, at.node).is_some() {
            return Err(EditorError::unsupported("cannot place a footnote inside the footnotes section"));
        }
        let number = self.records.len() + 1;
        let id = self.fresh_id(doc, root);

        let reference = build_reference(doc, &id, number);
        let after = insert_at_boundary(doc, at, reference)?;

        let list = ensure_section(doc, root);
        let content = build_item(doc, &id, number, text);
        doc.append_child(list, content);

        let record = FootnoteRecord {
            id: id.clone(),
            number,
            reference,
            content,
            text: text.to_owned(),
        };
        tracing::debug!(target: "plume::footnotes", %id, number, "created footnote");
        self.records.push(record.clone());
        Ok((record, after))
    }

    /// Remove both sides of a footnote, drop an emptied section, renumber.
    ///
    /// Returns false when no footnote has that id.
    pub fn delete(&mut self, doc: &mut Document, root: NodeId, id: &str) -> bool {
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            return false;
        };
        let record = self.records.remove(pos);
        let section = section_of(doc, record.content);
        doc.detach(record.reference);
        doc.detach(record.content);

        if let Some(section) = section {
            let has_entries = doc
                .descendants(section)
                .into_iter()
                .any(|n| doc.has_class(n, ITEM_CLASS) && doc.has_attr(n, FOOTNOTE_ID_ATTR));
            if !has_entries {
                doc.detach(section);
                tracing::debug!(target: "plume::footnotes", "removed empty footnotes section");
            }
        }
        tracing::debug!(target: "plume::footnotes", %id, "deleted footnote");
        self.renumber(doc, root);
        true
    }

    /// Reassign numbers by reference document order, on both sides of each
    /// pair, and reorder content entries to match.
    pub fn renumber(&mut self, doc: &mut Document, root: NodeId) {
        let order: Vec<SmolStr> = reference_nodes(doc, root)
            .into_iter()
            .filter_map(|n| doc.attr(n, FOOTNOTE_ID_ATTR).map(SmolStr::new))
            .collect();

        let mut number = 0;
        for id in &order {
            let Some(record) = self.records.iter_mut().find(|r| &r.id == id) else {
                continue;
            };
            if !doc.contains(root, record.content) {
                continue;
            }
            number += 1;
            record.number = number;
            set_reference_number(doc, record.reference, number);
            set_item_number(doc, record.content, number);
            // Appending in order leaves the list sorted.
            if let Some(list) = doc.parent(record.content) {
                doc.append_child(list, record.content);
            }
        }
        self.records.sort_by_key(|r| r.number);
        tracing::trace!(target: "plume::footnotes", count = number, "renumbered footnotes");
    }

    /// Change the content text of a footnote.
    pub fn set_text(&mut self, doc: &mut Document, id: &str, text: &str) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        let Some(span) = doc
            .children(record.content)
            .iter()
            .copied()
            .find(|&c| doc.has_class(c, TEXT_CLASS))
        else {
            return false;
        };
        doc.take_children(span);
        let node = doc.create_text(text);
        doc.append_child(span, node);
        text.clone_into(&mut record.text);
        true
    }

    /// Recover the registry from markup already in the tree.
    ///
    /// Pairs are matched by id; only complete pairs become records, numbered
    /// by reference order.
    pub fn rebuild(&mut self, doc: &Document, root: NodeId) {
        let items = item_nodes(doc, root);
        self.records.clear();
        for (i, reference) in reference_nodes(doc, root).into_iter().enumerate() {
            let Some(id) = doc.attr(reference, FOOTNOTE_ID_ATTR) else {
                continue;
            };
            let Some(&content) = items
                .iter()
                .find(|&&item| doc.attr(item, FOOTNOTE_ID_ATTR) == Some(id))
            else {
                continue;
            };
            self.records.push(FootnoteRecord {
                id: SmolStr::new(id),
                number: i + 1,
                reference,
                content,
                text: item_text(doc, content),
            });
            if let Some(serial) = id
                .strip_prefix(self.prefix.as_str())
                .and_then(|s| s.strip_prefix('-'))
                .and_then(|s| s.parse::<u64>().ok())
            {
                self.next_serial = self.next_serial.max(serial + 1);
            }
        }
        for (i, record) in self.records.iter_mut().enumerate() {
            record.number = i + 1;
        }
        tracing::debug!(target: "plume::footnotes", count = self.records.len(), "rebuilt footnote registry");
    }

    /// List broken pairs. Nothing is repaired.
    pub fn integrity_report(&self, doc: &Document, root: NodeId) -> Vec<IntegrityIssue> {
        let refs = reference_nodes(doc, root);
        let items = item_nodes(doc, root);
        let id_of = |n: NodeId| doc.attr(n, FOOTNOTE_ID_ATTR).map(SmolStr::new);
        let mut issues = Vec::new();

        for (pos, &reference) in refs.iter().enumerate() {
            let Some(id) = id_of(reference) else { continue };
            let Some(&item) = items.iter().find(|&&i| id_of(i).as_ref() == Some(&id)) else {
                issues.push(IntegrityIssue::MissingContent(id));
                continue;
            };
            let ref_number = reference_number(doc, reference);
            let item_number = doc.attr(item, "value").and_then(|v| v.parse().ok());
            if ref_number != item_number {
                issues.push(IntegrityIssue::NumberMismatch {
                    id,
                    reference: ref_number,
                    content: item_number,
                });
            } else if ref_number != Some(pos + 1) {
                issues.push(IntegrityIssue::Gap {
                    expected: pos + 1,
                    found: ref_number.unwrap_or(0),
                });
            }
        }
        for &item in &items {
            let Some(id) = id_of(item) else { continue };
            if !refs.iter().any(|&r| id_of(r).as_ref() == Some(&id)) {
                issues.push(IntegrityIssue::MissingReference(id));
            }
        }
        issues
    }
}

/// Reference markers in document order.
fn reference_nodes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|&n| doc.has_class(n, REF_CLASS) && doc.has_attr(n, FOOTNOTE_ID_ATTR))
        .collect()
}

/// Content entries in document order.
fn item_nodes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|&n| doc.has_class(n, ITEM_CLASS) && doc.has_attr(n, FOOTNOTE_ID_ATTR))
        .collect()
}

/// The footnotes section containing `node`, if any.
pub fn section_of(doc: &Document, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .find(|&n| doc.has_attr(n, SECTION_ATTR))
}

/// Whether `node` belongs to footnote markup that plain editing must not alter.
pub fn is_footnote_markup(doc: &Document, node: NodeId) -> bool {
    doc.has_attr(node, FOOTNOTE_ID_ATTR) || doc.has_attr(node, SECTION_ATTR)
}

/// The section's list, creating section and list at the end of root on first use.
fn ensure_section(doc: &mut Document, root: NodeId) -> NodeId {
    let existing = doc
        .children(root)
        .iter()
        .copied()
        .find(|&c| doc.has_attr(c, SECTION_ATTR));
    let section = match existing {
        Some(section) => section,
        None => {
            let section = doc.create_element_with(
                "section",
                [("class", "footnotes"), (SECTION_ATTR, "")],
            );
            doc.append_child(root, section);
            section
        }
    };
    match doc
        .children(section)
        .iter()
        .copied()
        .find(|&c| doc.has_tag(c, "ol"))
    {
        Some(list) => list,
        None => {
            let list = doc.create_element("ol");
            doc.append_child(section, list);
            list
        }
    }
}

fn build_reference(doc: &mut Document, id: &str, number: usize) -> NodeId {
    let ref_id = format!("ref-{id}");
    let href = format!("#{id}");
    let sup = doc.create_element_with(
        "sup",
        [
            ("class", REF_CLASS),
            ("id", ref_id.as_str()),
            (FOOTNOTE_ID_ATTR, id),
            ("contenteditable", "false"),
        ],
    );
    let link = doc.create_element_with("a", [("href", href.as_str())]);
    let label = doc.create_text(&number.to_string());
    doc.append_child(link, label);
    doc.append_child(sup, link);
    sup
}

fn build_item(doc: &mut Document, id: &str, number: usize, text: &str) -> NodeId {
    let back = format!("#ref-{id}");
    let value = number.to_string();
    let li = doc.create_element_with(
        "li",
        [
            ("class", ITEM_CLASS),
            ("id", id),
            (FOOTNOTE_ID_ATTR, id),
            ("value", value.as_str()),
        ],
    );
    let span = doc.create_element_with("span", [("class", TEXT_CLASS)]);
    let body = doc.create_text(text);
    doc.append_child(span, body);
    let backref = doc.create_element_with(
        "a",
        [("class", BACKREF_CLASS), ("href", back.as_str())],
    );
    let arrow = doc.create_text("\u{21a9}");
    doc.append_child(backref, arrow);
    doc.append_child(li, span);
    doc.append_child(li, backref);
    li
}

fn reference_number(doc: &Document, reference: NodeId) -> Option<usize> {
    doc.text_content(reference).trim().parse().ok()
}

fn set_reference_number(doc: &mut Document, reference: NodeId, number: usize) {
    let label = doc
        .descendants(reference)
        .into_iter()
        .find(|&n| doc.is_text(n));
    match label {
        Some(label) => doc.set_text(label, &number.to_string()),
        None => {
            let label = doc.create_text(&number.to_string());
            doc.append_child(reference, label);
        }
    }
}

fn set_item_number(doc: &mut Document, item: NodeId, number: usize) {
    doc.set_attr(item, "value", &number.to_string());
}

fn item_text(doc: &Document, item: NodeId) -> String {
    doc.children(item)
        .iter()
        .copied()
        .find(|&c| doc.has_class(c, TEXT_CLASS))
        .map(|span| doc.text_content(span))
        .unwrap_or_default()
}
