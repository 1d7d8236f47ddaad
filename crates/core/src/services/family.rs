//! Family membership lookups.
//!
//! Every occurrence carries an explicit immutable `family_id` assigned at
//! create time; [`members_of`] is a plain index lookup by that key. The
//! older label-derived grouping survives as [`base_title`] and
//! [`members_by_title`] for the title-based command surface — that path
//! silently merges two unrelated families whose titles collide after
//! suffix stripping, a documented hazard this module does not correct.

use uuid::Uuid;

use crate::models::occurrence::Occurrence;

/// Strip one trailing `" (<digits>/<digits>)"` suffix, if present.
///
/// `"Car loan (3/12)"` → `"Car loan"`; anything that does not end in a
/// well-formed `(k/n)` group is returned unchanged.
#[must_use]
pub fn base_title(title: &str) -> &str {
    let trimmed = title.trim_end();
    let Some(body) = trimmed.strip_suffix(')') else {
        return title;
    };
    let Some(open) = body.rfind('(') else {
        return title;
    };

    let inner = &body[open + 1..];
    let Some((k, n)) = inner.split_once('/') else {
        return title;
    };
    if k.is_empty()
        || n.is_empty()
        || !k.bytes().all(|b| b.is_ascii_digit())
        || !n.bytes().all(|b| b.is_ascii_digit())
    {
        return title;
    }

    body[..open].trim_end()
}

/// All occurrences belonging to the family identified by `family_id`.
#[must_use]
pub fn members_of(occurrences: &[Occurrence], family_id: Uuid) -> Vec<&Occurrence> {
    occurrences
        .iter()
        .filter(|o| o.family_id == family_id)
        .collect()
}

/// All occurrences whose stripped title equals the stripped reference title.
///
/// Label-derived grouping: colliding base titles across unrelated families
/// are merged silently.
#[must_use]
pub fn members_by_title<'a>(
    occurrences: &'a [Occurrence],
    reference_title: &str,
) -> Vec<&'a Occurrence> {
    let reference = base_title(reference_title);
    occurrences
        .iter()
        .filter(|o| base_title(&o.title) == reference)
        .collect()
}

/// Resolve a reference title to the family ids it matches, in first-seen
/// order without duplicates. More than one id means the title is colliding
/// across families.
#[must_use]
pub fn family_ids_for_title(occurrences: &[Occurrence], reference_title: &str) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for member in members_by_title(occurrences, reference_title) {
        if !ids.contains(&member.family_id) {
            ids.push(member.family_id);
        }
    }
    ids
}
