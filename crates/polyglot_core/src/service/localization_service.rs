//! Localization consistency engine.
//!
//! # Responsibility
//! - Fill in a default locale on entries created without one.
//! - Re-derive and push the sibling list of every member of a locale group.
//! - Mirror shared (non-localized) attribute values onto every sibling.
//!
//! # Invariants
//! - The subject entry is never the target of its own update.
//! - No sibling list ever contains its owner's id.
//! - Propagation payloads never carry localized attributes, `locale` or
//!   `localizations`.
//! - Given the same subject state, every operation issues the same updates,
//!   so a partially failed run can be retried as is.
//!
//! Store errors propagate unchanged. Updates already issued before a failure
//! stay applied unless the caller scoped the call in a transaction (see
//! `crate::db::with_immediate_transaction`).

use crate::model::content_model::ContentModel;
use crate::model::entry::{Entry, EntryId, EntryInput, EntryPatch};
use crate::repo::entry_repo::{EntryStore, RepoResult};
use crate::repo::locale_repo::{LocaleError, LocaleProvider};
use log::{debug, error, info};

/// Assigns the configured default locale when `input` has none.
///
/// Only a missing or empty locale is filled in. Any other value already on
/// `input` is left untouched, even whitespace, and `locales` is not
/// consulted; malformed tags are rejected later by the store. Lookup failures propagate unchanged.
pub fn assign_default_locale<P>(input: &mut EntryInput, locales: &P) -> Result<(), LocaleError>
where
    P: LocaleProvider + ?Sized,
{
    if input.has_locale() {
        return Ok(());
    }

    let locale = locales.default_locale().map_err(|err| {
        error!(
            "event=locale_default module=localization status=error model={} error={err}",
            input.model_uid
        );
        err
    })?;
    debug!(
        "event=locale_default module=localization status=ok model={} locale={locale}",
        input.model_uid
    );
    input.locale = Some(locale);
    Ok(())
}

/// Computes the sibling list each group member must hold.
///
/// For every id `s` in `siblings`, the target list is `subject_id` followed
/// by the remaining siblings in their original order with every occurrence
/// of `s` removed. Occurrences of `subject_id` inside `siblings` are ignored.
/// Other duplicates are kept, yielding one target per occurrence.
pub fn sibling_localizations(
    subject_id: EntryId,
    siblings: &[EntryId],
) -> Vec<(EntryId, Vec<EntryId>)> {
    let siblings: Vec<EntryId> = siblings
        .iter()
        .copied()
        .filter(|id| *id != subject_id)
        .collect();

    siblings
        .iter()
        .map(|&target| {
            let mut localizations = Vec::with_capacity(siblings.len());
            localizations.push(subject_id);
            localizations.extend(siblings.iter().copied().filter(|id| *id != target));
            (target, localizations)
        })
        .collect()
}

/// Pushes the group's sibling lists from `entry`'s authoritative list.
///
/// Issues one `update_entry` per sibling and never updates `entry` itself.
/// Returns the number of updates issued.
pub fn sync_localizations<S>(entry: &Entry, model: &ContentModel, store: &S) -> RepoResult<usize>
where
    S: EntryStore + ?Sized,
{
    let targets = sibling_localizations(entry.id, &entry.localizations);
    if targets.is_empty() {
        return Ok(0);
    }

    for (target, localizations) in &targets {
        store
            .update_entry(*target, &EntryPatch::localizations(localizations.clone()))
            .map_err(|err| {
                error!(
                    "event=localizations_sync module=localization status=error model={} entry_id={} target_id={target} error={err}",
                    model.uid, entry.id
                );
                err
            })?;
    }

    info!(
        "event=localizations_sync module=localization status=ok model={} entry_id={} updates={}",
        model.uid,
        entry.id,
        targets.len()
    );
    Ok(targets.len())
}

/// Copies `entry`'s shared attribute values onto every sibling.
///
/// Returns early with zero updates when the model has no shared attributes
/// or `entry` has no siblings. Otherwise issues one identical payload per
/// sibling and returns the number of updates issued.
pub fn update_non_localized_fields<S>(
    entry: &Entry,
    model: &ContentModel,
    store: &S,
) -> RepoResult<usize>
where
    S: EntryStore + ?Sized,
{
    if model.non_localized_attributes().is_empty() {
        return Ok(0);
    }

    let targets: Vec<EntryId> = entry
        .localizations
        .iter()
        .copied()
        .filter(|id| *id != entry.id)
        .collect();
    if targets.is_empty() {
        return Ok(0);
    }

    let patch = EntryPatch::attributes(model.copy_non_localized_attributes(&entry.attributes));
    for target in &targets {
        store.update_entry(*target, &patch).map_err(|err| {
            error!(
                "event=shared_fields_sync module=localization status=error model={} entry_id={} target_id={target} error={err}",
                model.uid, entry.id
            );
            err
        })?;
    }

    info!(
        "event=shared_fields_sync module=localization status=ok model={} entry_id={} updates={} fields={}",
        model.uid,
        entry.id,
        targets.len(),
        patch.attributes.len()
    );
    Ok(targets.len())
}

#[cfg(test)]
mod tests {
    use super::sibling_localizations;

    #[test]
    fn two_siblings_receive_subject_and_each_other() {
        assert_eq!(
            sibling_localizations(1, &[2, 3]),
            vec![(2, vec![1, 3]), (3, vec![1, 2])]
        );
    }

    #[test]
    fn each_target_list_has_group_size_minus_one() {
        let siblings = [4, 9, 2, 7];
        let targets = sibling_localizations(5, &siblings);

        assert_eq!(targets.len(), siblings.len());
        for (target, localizations) in targets {
            assert_eq!(localizations.len(), siblings.len());
            assert_eq!(localizations[0], 5);
            assert!(!localizations.contains(&target));
        }
    }

    #[test]
    fn empty_sibling_list_yields_no_targets() {
        assert!(sibling_localizations(1, &[]).is_empty());
    }

    #[test]
    fn subject_listed_among_siblings_is_ignored() {
        assert_eq!(
            sibling_localizations(1, &[2, 1, 3]),
            vec![(2, vec![1, 3]), (3, vec![1, 2])]
        );
    }

    #[test]
    fn duplicates_propagate_into_other_lists() {
        assert_eq!(
            sibling_localizations(1, &[2, 3, 3]),
            vec![(2, vec![1, 3, 3]), (3, vec![1, 2]), (3, vec![1, 2])]
        );
    }
}
