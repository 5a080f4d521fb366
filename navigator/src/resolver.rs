use cardmark::query::{find_section_by_label, find_section_position};
use cardmark::{Document, Section};

use crate::error::NavigationIssue;

/// The section a label navigates to. Exact, case-sensitive match on named
/// labels; the first match in document order wins.
pub fn resolve<'d>(document: &'d Document, label: &str) -> Option<&'d Section> {
    let found = find_section_by_label(label, &document.sections);
    if found.is_none() {
        report_miss(label);
    }
    found
}

/// Like [`resolve`], returning the section's index.
pub fn resolve_position(document: &Document, label: &str) -> Option<usize> {
    let found = find_section_position(label, &document.sections);
    if found.is_none() {
        report_miss(label);
    }
    found
}

fn report_miss(label: &str) {
    log::debug!(
        "{}",
        NavigationIssue::LookupMiss {
            label: label.to_string()
        }
    );
}
