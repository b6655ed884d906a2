//! Prompt templates for field extraction.
//!
//! Every prompt lives here so the wording can be changed in one place and
//! inspected by unit tests without a live model. [`build_prompt`] is pure:
//! the same content and kind always produce the same string.

use crate::document::DocumentKind;
use crate::output::ExtractedContent;

/// Fields requested from a property document.
pub const PROPERTY_FIELDS: &[&str] = &[
    "Property name",
    "Address",
    "Type (residential/commercial)",
    "Total units",
    "Features",
    "Amenities",
];

/// Fields requested from a tenant document.
pub const TENANT_FIELDS: &[&str] = &[
    "First name",
    "Last name",
    "Email",
    "Phone number",
    "Emergency contact details",
    "Lease terms",
];

const FORMAT_INSTRUCTION: &str = "Format the response as valid JSON.";

/// The fixed field checklist for a document kind.
pub fn field_checklist(kind: DocumentKind) -> &'static [&'static str] {
    match kind {
        DocumentKind::Property => PROPERTY_FIELDS,
        DocumentKind::Tenant => TENANT_FIELDS,
    }
}

/// Build the extraction instruction for `content`.
///
/// Layout: heading line, one `- field` line per checklist entry, the JSON
/// format instruction, a metadata block, then the document text.
pub fn build_prompt(content: &ExtractedContent, kind: DocumentKind) -> String {
    let mut prompt = format!("Extract the following {kind} information from this document:\n");
    for field in field_checklist(kind) {
        prompt.push_str("- ");
        prompt.push_str(field);
        prompt.push('\n');
    }
    prompt.push_str(FORMAT_INSTRUCTION);
    prompt.push_str("\n\n");

    let meta = &content.metadata;
    prompt.push_str(&format!("Document pages: {}\n", meta.page_count));
    if let Some(ref title) = meta.title {
        prompt.push_str(&format!("Document title: {title}\n"));
    }
    if let Some(ref author) = meta.author {
        prompt.push_str(&format!("Document author: {author}\n"));
    }

    prompt.push_str("\nDocument text: ");
    prompt.push_str(&content.text);
    prompt
}
