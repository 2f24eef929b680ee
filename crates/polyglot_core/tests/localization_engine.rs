use polyglot_core::{
    assign_default_locale, sync_localizations, update_non_localized_fields, AttributeSpec,
    ContentModel, Entry, EntryId, EntryInput, EntryPatch, EntryStore, LocaleError,
    LocaleProvider, RepoError, RepoResult, StaticLocaleProvider,
};
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};

/// Store double that records every update call in order.
#[derive(Default)]
struct RecordingStore {
    updates: RefCell<Vec<(EntryId, EntryPatch)>>,
    fail_on: Option<EntryId>,
}

impl RecordingStore {
    fn failing_on(id: EntryId) -> Self {
        Self {
            fail_on: Some(id),
            ..Self::default()
        }
    }

    fn updates(&self) -> Vec<(EntryId, EntryPatch)> {
        self.updates.borrow().clone()
    }
}

impl EntryStore for RecordingStore {
    fn create_entry(&self, _input: &EntryInput) -> RepoResult<EntryId> {
        unreachable!("engine operations never create entries")
    }

    fn get_entry(&self, _id: EntryId) -> RepoResult<Option<Entry>> {
        unreachable!("engine operations never read siblings")
    }

    fn update_entry(&self, id: EntryId, patch: &EntryPatch) -> RepoResult<()> {
        if self.fail_on == Some(id) {
            return Err(RepoError::NotFound(id));
        }
        self.updates.borrow_mut().push((id, patch.clone()));
        Ok(())
    }
}

/// Locale provider double that counts lookups.
struct CountingLocales {
    calls: Cell<usize>,
    inner: StaticLocaleProvider,
}

impl CountingLocales {
    fn new(inner: StaticLocaleProvider) -> Self {
        Self {
            calls: Cell::new(0),
            inner,
        }
    }
}

impl LocaleProvider for CountingLocales {
    fn default_locale(&self) -> Result<String, LocaleError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.default_locale()
    }
}

fn model() -> ContentModel {
    ContentModel::new("test-model", true)
        .with_attribute("title", AttributeSpec::localized("string"))
        .with_attribute("stars", AttributeSpec::shared("integer"))
}

fn all_localized_model() -> ContentModel {
    ContentModel::new("test-model", true)
        .with_attribute("title", AttributeSpec::localized("string"))
        .with_attribute("stars", AttributeSpec::localized("integer"))
}

fn entry(id: EntryId, attributes: Value, localizations: Vec<EntryId>) -> Entry {
    Entry {
        id,
        model_uid: "test-model".to_string(),
        locale: "test".to_string(),
        attributes: attributes.as_object().cloned().unwrap(),
        localizations,
    }
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn existing_locale_is_kept_and_provider_not_consulted() {
    let locales = CountingLocales::new(StaticLocaleProvider::new("de-CH"));
    let mut input = EntryInput::new("test-model").with_locale("myLocale");

    assign_default_locale(&mut input, &locales).unwrap();

    assert_eq!(input.locale.as_deref(), Some("myLocale"));
    assert_eq!(locales.calls.get(), 0);
}

#[test]
fn missing_locale_gets_default() {
    let locales = CountingLocales::new(StaticLocaleProvider::new("de-CH"));
    let mut input = EntryInput::new("test-model");

    assign_default_locale(&mut input, &locales).unwrap();

    assert_eq!(input.locale.as_deref(), Some("de-CH"));
    assert_eq!(locales.calls.get(), 1);
}

#[test]
fn assigning_twice_matches_assigning_once() {
    let locales = CountingLocales::new(StaticLocaleProvider::new("en"));
    let mut input = EntryInput::new("test-model");

    assign_default_locale(&mut input, &locales).unwrap();
    let once = input.clone();
    assign_default_locale(&mut input, &locales).unwrap();

    assert_eq!(input, once);
    assert_eq!(locales.calls.get(), 1);
}

#[test]
fn empty_locale_counts_as_missing() {
    let locales = CountingLocales::new(StaticLocaleProvider::new("en"));
    let mut input = EntryInput::new("test-model").with_locale("");

    assign_default_locale(&mut input, &locales).unwrap();

    assert_eq!(input.locale.as_deref(), Some("en"));
    assert_eq!(locales.calls.get(), 1);
}

#[test]
fn whitespace_locale_is_kept_and_provider_not_consulted() {
    let locales = CountingLocales::new(StaticLocaleProvider::new("en"));
    let mut input = EntryInput::new("test-model").with_locale("  ");

    assign_default_locale(&mut input, &locales).unwrap();

    assert_eq!(input.locale.as_deref(), Some("  "));
    assert_eq!(locales.calls.get(), 0);
}

#[test]
fn provider_failure_propagates_and_leaves_input_untouched() {
    let mut input = EntryInput::new("test-model");

    let err = assign_default_locale(&mut input, &StaticLocaleProvider::unconfigured()).unwrap_err();

    assert!(matches!(err, LocaleError::NoDefaultLocale));
    assert_eq!(input.locale, None);
}

#[test]
fn sync_updates_every_other_localization_with_correct_ids() {
    let store = RecordingStore::default();
    let subject = entry(1, json!({}), vec![2, 3]);

    let issued = sync_localizations(&subject, &model(), &store).unwrap();

    assert_eq!(issued, 2);
    assert_eq!(
        store.updates(),
        vec![
            (2, EntryPatch::localizations(vec![1, 3])),
            (3, EntryPatch::localizations(vec![1, 2])),
        ]
    );
}

#[test]
fn sync_never_targets_subject() {
    let store = RecordingStore::default();
    let subject = entry(1, json!({}), vec![4, 5, 6, 7]);

    sync_localizations(&subject, &model(), &store).unwrap();

    let updates = store.updates();
    assert_eq!(updates.len(), 4);
    for (target, patch) in updates {
        assert_ne!(target, 1);
        let localizations = patch.localizations.unwrap();
        assert_eq!(localizations.len(), 4);
        assert_eq!(localizations[0], 1);
        assert!(!localizations.contains(&target));
        assert!(patch.attributes.is_empty());
    }
}

#[test]
fn empty_group_issues_no_calls() {
    let store = RecordingStore::default();
    let subject = entry(1, json!({ "title": "Solo", "stars": 2 }), Vec::new());

    assert_eq!(sync_localizations(&subject, &model(), &store).unwrap(), 0);
    assert_eq!(update_non_localized_fields(&subject, &model(), &store).unwrap(), 0);
    assert!(store.updates().is_empty());
}

#[test]
fn fully_localized_model_issues_no_propagation() {
    let store = RecordingStore::default();
    let subject = entry(1, json!({ "title": "Localized", "stars": 1 }), vec![2, 3]);

    let issued = update_non_localized_fields(&subject, &all_localized_model(), &store).unwrap();

    assert_eq!(issued, 0);
    assert!(store.updates().is_empty());
}

#[test]
fn propagation_sends_non_localized_fields_only() {
    let store = RecordingStore::default();
    let subject = entry(1, json!({ "title": "Localized", "stars": 1 }), vec![2]);

    let issued = update_non_localized_fields(&subject, &model(), &store).unwrap();

    assert_eq!(issued, 1);
    assert_eq!(
        store.updates(),
        vec![(2, EntryPatch::attributes(object(json!({ "stars": 1 }))))]
    );
}

#[test]
fn propagation_payload_is_identical_for_all_siblings() {
    let store = RecordingStore::default();
    let model = model().with_attribute("cover", AttributeSpec::shared("media"));
    let subject = entry(
        1,
        json!({ "title": "Hi", "stars": 4, "cover": { "url": "a.png" } }),
        vec![2, 3, 4],
    );

    update_non_localized_fields(&subject, &model, &store).unwrap();

    let expected = EntryPatch::attributes(object(json!({ "stars": 4, "cover": { "url": "a.png" } })));
    let updates = store.updates();
    assert_eq!(
        updates.iter().map(|(target, _)| *target).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
    assert!(updates.iter().all(|(_, patch)| *patch == expected));
}

#[test]
fn reinvoking_with_same_state_repeats_same_updates() {
    let subject = entry(10, json!({ "title": "T", "stars": 9 }), vec![11, 12]);
    let first = RecordingStore::default();
    let second = RecordingStore::default();

    for store in [&first, &second] {
        sync_localizations(&subject, &model(), store).unwrap();
        update_non_localized_fields(&subject, &model(), store).unwrap();
    }

    assert_eq!(first.updates(), second.updates());
}

#[test]
fn store_error_propagates_after_partial_updates() {
    let store = RecordingStore::failing_on(3);
    let subject = entry(1, json!({}), vec![2, 3, 4]);

    let err = sync_localizations(&subject, &model(), &store).unwrap_err();

    assert!(matches!(err, RepoError::NotFound(3)));
    assert_eq!(store.updates(), vec![(2, EntryPatch::localizations(vec![1, 3, 4]))]);
}
