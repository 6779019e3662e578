//! # Endpoint id extraction from registry listings.
//!
//! A listing is free text. The entry of interest is identified by a literal
//! label; its id is the space-delimited token right before the label. When the
//! label occurs several times, the most recent (last) occurrence wins.
//!
//! ```text
//! client 14: 'Midi Through' [type=kernel]
//! client 128:0: 'TiMidity' [type=user,pid=4242]
//!        └─┬─┘└─────┬────┘
//!         id      label = ": 'TiMidity'"
//! ```

/// Returns the id preceding the last occurrence of `label`, if any.
///
/// The id starts after the last space before the match, or at the start of the text.
/// An empty id counts as not found.
pub fn find_endpoint<'a>(listing: &'a str, label: &str) -> Option<&'a str> {
    if label.is_empty() {
        return None;
    }
    let end = listing.rfind(label)?;
    let head = &listing[..end];
    let start = head.rfind(' ').map_or(0, |i| i + 1);
    let id = &head[start..];
    (!id.is_empty()).then_some(id)
}
