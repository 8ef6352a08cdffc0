//! A/B variant selection for the embed endpoint.
//!
//! Stateless round-robin: the caller remembers which variant it was served
//! last and sends it back; the next one in label order is returned. Nothing is
//! persisted, so concurrent callers with the same last-seen id get the same
//! variant.

use crate::popup::Popup;

/// Pick the popup to serve from a site's active popups.
///
/// `active` must be ordered newest first. The newest popup wins unless it
/// belongs to a test group, in which case the group's members are ordered by
/// `variant_label` (missing label sorts as `""`; equal labels keep newest
/// first) and the member after `last_variant_id` is chosen, wrapping around.
/// An absent or unknown `last_variant_id` selects the first member.
pub fn select_variant<'a>(active: &'a [Popup], last_variant_id: Option<&str>) -> Option<&'a Popup> {
    let newest = active.first()?;
    let Some(group) = newest.test_group_id.as_deref() else {
        return Some(newest);
    };

    let mut variants: Vec<&Popup> = active
        .iter()
        .filter(|p| p.test_group_id.as_deref() == Some(group))
        .collect();
    // Stable sort: ties stay newest-first.
    variants.sort_by(|a, b| label(a).cmp(label(b)));

    let next = last_variant_id
        .and_then(|last| variants.iter().position(|v| v.id == last))
        .map(|i| (i + 1) % variants.len())
        .unwrap_or(0);

    variants.get(next).copied()
}

fn label(p: &Popup) -> &str {
    p.variant_label.as_deref().unwrap_or("")
}
