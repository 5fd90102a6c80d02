//! Step-wise form state machine over a single proposal.
//!
//! # Invariants
//! - The step index always lies in `[0, Step::COUNT - 1]`.
//! - Every mutation replaces the shared `Arc<Record>`; the previous value is
//!   never modified, so holders of an old `Arc` can detect change with
//!   `Arc::ptr_eq`.
//! - Every mutation is mirrored to the local cache when one is attached.
//!   Cache failures are logged and otherwise ignored.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::cache::LocalCache;
use crate::record::{AudienceGroup, CanBeAdapted, DisabilityType, Record};

/// Key under which the in-progress proposal is cached.
pub const CACHE_KEY: &str = "workshop_proposal_local";

// ============================================================================
// Steps and Fields
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Name,
    Rationale,
    Objectives,
    Audience,
    Axes,
    Capacity,
    ResponsibleParties,
    Sequence,
    Resources,
    Logistics,
    Accessibility,
    Spaces,
    Integration,
    FinalNotes,
}

/// How a step is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Free-text fields only
    Text,
    /// Audience flags plus clarifications
    AudienceSelection,
    /// Yes/no choice, disability flags and follow-up text
    Accessibility,
}

impl Step {
    pub const ALL: [Step; 14] = [
        Step::Name,
        Step::Rationale,
        Step::Objectives,
        Step::Audience,
        Step::Axes,
        Step::Capacity,
        Step::ResponsibleParties,
        Step::Sequence,
        Step::Resources,
        Step::Logistics,
        Step::Accessibility,
        Step::Spaces,
        Step::Integration,
        Step::FinalNotes,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn at(index: usize) -> Step {
        Self::ALL[index.min(Self::COUNT - 1)]
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn key(self) -> &'static str {
        match self {
            Step::Name => "name",
            Step::Rationale => "rationale",
            Step::Objectives => "objectives",
            Step::Audience => "audience",
            Step::Axes => "axes",
            Step::Capacity => "capacity",
            Step::ResponsibleParties => "responsibleParties",
            Step::Sequence => "sequence",
            Step::Resources => "resources",
            Step::Logistics => "logistics",
            Step::Accessibility => "accessibility",
            Step::Spaces => "spaces",
            Step::Integration => "integration",
            Step::FinalNotes => "finalNotes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Name => "Workshop / activity name",
            Step::Rationale => "Brief rationale",
            Step::Objectives => "Objectives",
            Step::Audience => "Target audience",
            Step::Axes => "Thematic axes",
            Step::Capacity => "Headcount and duration",
            Step::ResponsibleParties => "Responsible parties",
            Step::Sequence => "Work sequence",
            Step::Resources => "Resources needed",
            Step::Logistics => "Logistics needed",
            Step::Accessibility => "Accessibility and inclusion",
            Step::Spaces => "Participating spaces",
            Step::Integration => "Integrating other spaces",
            Step::FinalNotes => "Final notes",
        }
    }

    pub fn kind(self) -> StepKind {
        match self {
            Step::Audience => StepKind::AudienceSelection,
            Step::Accessibility => StepKind::Accessibility,
            _ => StepKind::Text,
        }
    }

    /// Text fields bound to this step.
    pub fn fields(self) -> &'static [TextField] {
        match self {
            Step::Name => &[TextField::Name],
            Step::Rationale => &[TextField::Rationale],
            Step::Objectives => &[TextField::Objectives],
            Step::Audience => &[TextField::AudienceClarifications],
            Step::Axes => &[TextField::Axes],
            Step::Capacity => &[TextField::Headcount, TextField::Duration],
            Step::ResponsibleParties => &[TextField::ResponsibleParties],
            Step::Sequence => &[TextField::Opening, TextField::Development, TextField::Closing],
            Step::Resources => &[TextField::Resources],
            Step::Logistics => &[TextField::Logistics],
            Step::Accessibility => &[TextField::DisabilityOther, TextField::WhatWouldBeNeeded],
            Step::Spaces => &[TextField::Spaces],
            Step::Integration => &[TextField::Integration],
            Step::FinalNotes => &[TextField::FinalNotes],
        }
    }
}

/// Every free-text field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Year,
    Name,
    Rationale,
    Objectives,
    AudienceClarifications,
    Axes,
    Headcount,
    Duration,
    ResponsibleParties,
    Opening,
    Development,
    Closing,
    Resources,
    Logistics,
    DisabilityOther,
    WhatWouldBeNeeded,
    Spaces,
    Integration,
    FinalNotes,
}

impl TextField {
    pub const ALL: [TextField; 19] = [
        TextField::Year,
        TextField::Name,
        TextField::Rationale,
        TextField::Objectives,
        TextField::AudienceClarifications,
        TextField::Axes,
        TextField::Headcount,
        TextField::Duration,
        TextField::ResponsibleParties,
        TextField::Opening,
        TextField::Development,
        TextField::Closing,
        TextField::Resources,
        TextField::Logistics,
        TextField::DisabilityOther,
        TextField::WhatWouldBeNeeded,
        TextField::Spaces,
        TextField::Integration,
        TextField::FinalNotes,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TextField::Year => "year",
            TextField::Name => "name",
            TextField::Rationale => "rationale",
            TextField::Objectives => "objectives",
            TextField::AudienceClarifications => "clarifications",
            TextField::Axes => "axes",
            TextField::Headcount => "headcount",
            TextField::Duration => "duration",
            TextField::ResponsibleParties => "responsibleParties",
            TextField::Opening => "opening",
            TextField::Development => "development",
            TextField::Closing => "closing",
            TextField::Resources => "resources",
            TextField::Logistics => "logistics",
            TextField::DisabilityOther => "other",
            TextField::WhatWouldBeNeeded => "whatWouldBeNeeded",
            TextField::Spaces => "spaces",
            TextField::Integration => "integration",
            TextField::FinalNotes => "finalNotes",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key().eq_ignore_ascii_case(key))
    }

    pub fn get(self, record: &Record) -> &str {
        match self {
            TextField::Year => &record.year,
            TextField::Name => &record.name,
            TextField::Rationale => &record.rationale,
            TextField::Objectives => &record.objectives,
            TextField::AudienceClarifications => &record.audience.clarifications,
            TextField::Axes => &record.axes,
            TextField::Headcount => &record.capacity.headcount,
            TextField::Duration => &record.capacity.duration,
            TextField::ResponsibleParties => &record.responsible_parties,
            TextField::Opening => &record.sequence.opening,
            TextField::Development => &record.sequence.development,
            TextField::Closing => &record.sequence.closing,
            TextField::Resources => &record.resources,
            TextField::Logistics => &record.logistics,
            TextField::DisabilityOther => &record.accessibility.disability_types.other,
            TextField::WhatWouldBeNeeded => &record.accessibility.what_would_be_needed,
            TextField::Spaces => &record.spaces,
            TextField::Integration => &record.integration,
            TextField::FinalNotes => &record.final_notes,
        }
    }

    fn slot(self, record: &mut Record) -> &mut String {
        match self {
            TextField::Year => &mut record.year,
            TextField::Name => &mut record.name,
            TextField::Rationale => &mut record.rationale,
            TextField::Objectives => &mut record.objectives,
            TextField::AudienceClarifications => &mut record.audience.clarifications,
            TextField::Axes => &mut record.axes,
            TextField::Headcount => &mut record.capacity.headcount,
            TextField::Duration => &mut record.capacity.duration,
            TextField::ResponsibleParties => &mut record.responsible_parties,
            TextField::Opening => &mut record.sequence.opening,
            TextField::Development => &mut record.sequence.development,
            TextField::Closing => &mut record.sequence.closing,
            TextField::Resources => &mut record.resources,
            TextField::Logistics => &mut record.logistics,
            TextField::DisabilityOther => &mut record.accessibility.disability_types.other,
            TextField::WhatWouldBeNeeded => &mut record.accessibility.what_would_be_needed,
            TextField::Spaces => &mut record.spaces,
            TextField::Integration => &mut record.integration,
            TextField::FinalNotes => &mut record.final_notes,
        }
    }

    pub fn set(self, record: &mut Record, value: impl Into<String>) {
        *self.slot(record) = value.into();
    }
}

// ============================================================================
// Wizard
// ============================================================================

/// Gate on leaving the first step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvancePolicy {
    /// Move freely; the name is only enforced when saving
    #[default]
    Free,
    /// Stay on the first step until a name is entered
    RequireName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Done,
    Active,
    Pending,
}

pub struct Wizard {
    record: Arc<Record>,
    step: usize,
    current_id: Option<String>,
    year: String,
    policy: AdvancePolicy,
    cache: Option<Box<dyn LocalCache>>,
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("step", &self.step)
            .field("current_id", &self.current_id)
            .field("policy", &self.policy)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl Wizard {
    /// Fresh wizard for a new proposal stamped with `year`.
    pub fn new(year: impl Into<String>, policy: AdvancePolicy) -> Self {
        let year = year.into();
        Wizard {
            record: Arc::new(Record::new(year.clone())),
            step: 0,
            current_id: None,
            year,
            policy,
            cache: None,
        }
    }

    /// Attaches a cache and restores any in-progress proposal from it.
    pub fn with_cache(mut self, cache: Box<dyn LocalCache>) -> Self {
        match cache.get(CACHE_KEY) {
            Ok(Some(saved)) => match self.record.merged_from_json(&saved) {
                Ok(record) => {
                    debug!("event=cache_restore status=ok");
                    self.record = Arc::new(record);
                }
                Err(e) => debug!("event=cache_restore status=ignored reason=\"{}\"", e),
            },
            Ok(None) => {}
            Err(e) => debug!("event=cache_restore status=ignored reason=\"{}\"", e),
        }
        self.cache = Some(cache);
        self
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.record
    }

    pub fn step(&self) -> Step {
        Step::at(self.step)
    }

    pub fn index(&self) -> usize {
        self.step
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn set_current_id(&mut self, id: Option<String>) {
        self.current_id = id;
    }

    pub fn is_first(&self) -> bool {
        self.step == 0
    }

    /// The last step offers export and finalize instead of next.
    pub fn is_last(&self) -> bool {
        self.step == Step::COUNT - 1
    }

    /// Whether `next` would leave the current step.
    pub fn can_proceed(&self) -> bool {
        if self.is_last() {
            return false;
        }
        match self.policy {
            AdvancePolicy::Free => true,
            AdvancePolicy::RequireName => !self.is_first() || self.record.has_name(),
        }
    }

    /// Advances one step. Returns false when nothing moved.
    pub fn next(&mut self) -> bool {
        if !self.can_proceed() {
            return false;
        }
        self.step = (self.step + 1).min(Step::COUNT - 1);
        true
    }

    /// Goes back one step. Returns false at the first step.
    pub fn back(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.step -= 1;
        true
    }

    /// Jumps to a step directly, clamped to the valid range.
    pub fn go_to(&mut self, index: usize) {
        self.step = index.min(Step::COUNT - 1);
    }

    /// Starts a new proposal: defaults, no id, first step.
    pub fn reset(&mut self) {
        self.current_id = None;
        self.step = 0;
        self.commit(Record::new(self.year.clone()));
    }

    /// Loads a saved proposal for editing.
    pub fn open(&mut self, id: impl Into<String>, record: Record) {
        self.current_id = Some(id.into());
        self.step = 0;
        self.commit(record);
    }

    /// Per-step progress markers.
    pub fn progress(&self) -> Vec<StepState> {
        (0..Step::COUNT)
            .map(|i| match i.cmp(&self.step) {
                std::cmp::Ordering::Less => StepState::Done,
                std::cmp::Ordering::Equal => StepState::Active,
                std::cmp::Ordering::Greater => StepState::Pending,
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Applies `patch` to a copy of the record and makes the copy current.
    pub fn update(&mut self, patch: impl FnOnce(&mut Record)) -> &Arc<Record> {
        let next = self.record.update(patch);
        self.commit(next);
        &self.record
    }

    pub fn text(&self, field: TextField) -> &str {
        field.get(&self.record)
    }

    pub fn set_text(&mut self, field: TextField, value: impl Into<String>) {
        let value = value.into();
        self.update(|r| field.set(r, value));
    }

    pub fn toggle_audience(&mut self, group: AudienceGroup) {
        self.update(|r| r.audience.toggle(group));
    }

    pub fn toggle_disability(&mut self, kind: DisabilityType) {
        self.update(|r| r.accessibility.disability_types.toggle(kind));
    }

    pub fn set_can_be_adapted(&mut self, choice: CanBeAdapted) {
        self.update(|r| r.accessibility.can_be_adapted = choice);
    }

    fn commit(&mut self, next: Record) {
        self.record = Arc::new(next);
        self.mirror();
    }

    fn mirror(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let result = serde_json::to_string(self.record.as_ref())
            .map_err(|e| e.to_string())
            .and_then(|json| cache.set(CACHE_KEY, &json).map_err(|e| e.to_string()));
        if let Err(reason) = result {
            debug!("event=cache_write status=ignored reason=\"{}\"", reason);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::CacheError;

    struct BrokenCache;

    impl LocalCache for BrokenCache {
        fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("disk gone".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("disk gone".into()))
        }
    }

    struct SharedCache(Arc<MemoryCache>);

    impl LocalCache for SharedCache {
        fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
            self.0.set(key, value)
        }
    }

    #[test]
    fn fourteen_steps_in_order() {
        assert_eq!(Step::COUNT, 14);
        assert_eq!(Step::at(0), Step::Name);
        assert_eq!(Step::at(13), Step::FinalNotes);
        assert_eq!(Step::at(99), Step::FinalNotes);
        assert_eq!(Step::Capacity.index(), 5);
    }

    #[test]
    fn next_and_back_are_bounded() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        assert!(!wizard.back());
        assert_eq!(wizard.index(), 0);

        for _ in 0..Step::COUNT + 5 {
            wizard.next();
        }
        assert_eq!(wizard.index(), Step::COUNT - 1);
        assert!(wizard.is_last());
        assert!(!wizard.next());
        assert_eq!(wizard.index(), Step::COUNT - 1);

        assert!(wizard.back());
        assert_eq!(wizard.index(), Step::COUNT - 2);
    }

    #[test]
    fn require_name_blocks_first_step_only() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::RequireName);
        assert!(!wizard.can_proceed());
        assert!(!wizard.next());
        wizard.set_text(TextField::Name, "   ");
        assert!(!wizard.next());
        wizard.set_text(TextField::Name, "Clay");
        assert!(wizard.next());
        wizard.set_text(TextField::Name, "");
        assert!(wizard.next());
        assert_eq!(wizard.index(), 2);
    }

    #[test]
    fn reset_clears_record_id_and_step() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        wizard.open("abc", Record::default().update(|r| r.name = "Saved".into()));
        wizard.go_to(7);
        wizard.reset();
        assert_eq!(wizard.index(), 0);
        assert_eq!(wizard.current_id(), None);
        assert_eq!(**wizard.record(), Record::new("2026"));
    }

    #[test]
    fn open_tracks_id_and_returns_to_first_step() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        wizard.go_to(4);
        wizard.open("id-1", Record::default().update(|r| r.axes = "soil".into()));
        assert_eq!(wizard.index(), 0);
        assert_eq!(wizard.current_id(), Some("id-1"));
        assert_eq!(wizard.text(TextField::Axes), "soil");
    }

    #[test]
    fn go_to_clamps() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        wizard.go_to(500);
        assert_eq!(wizard.step(), Step::FinalNotes);
    }

    #[test]
    fn mutations_swap_the_shared_record() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        let before = Arc::clone(wizard.record());
        wizard.toggle_audience(AudienceGroup::Teens);
        assert!(!Arc::ptr_eq(&before, wizard.record()));
        assert!(!before.audience.teens);
        assert!(wizard.record().audience.teens);
    }

    #[test]
    fn group_steps_toggle_single_flags() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        wizard.toggle_disability(DisabilityType::Auditory);
        wizard.toggle_disability(DisabilityType::Motor);
        wizard.toggle_disability(DisabilityType::Auditory);
        wizard.set_can_be_adapted(CanBeAdapted::Yes);
        let types = &wizard.record().accessibility.disability_types;
        assert!(types.motor && !types.auditory);
        assert_eq!(wizard.record().accessibility.can_be_adapted, CanBeAdapted::Yes);
    }

    #[test]
    fn progress_marks_done_active_pending() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        wizard.go_to(2);
        let progress = wizard.progress();
        assert_eq!(progress.len(), Step::COUNT);
        assert_eq!(&progress[..4], &[StepState::Done, StepState::Done, StepState::Active, StepState::Pending]);
    }

    #[test]
    fn mutations_are_mirrored_and_restored() {
        let cache = Arc::new(MemoryCache::new());
        {
            let mut wizard = Wizard::new("2026", AdvancePolicy::Free)
                .with_cache(Box::new(SharedCache(Arc::clone(&cache))));
            wizard.set_text(TextField::Name, "Draft");
            wizard.set_text(TextField::Headcount, "12");
        }
        let restored = Wizard::new("2026", AdvancePolicy::Free)
            .with_cache(Box::new(SharedCache(Arc::clone(&cache))));
        assert_eq!(restored.text(TextField::Name), "Draft");
        assert_eq!(restored.text(TextField::Headcount), "12");
        assert_eq!(restored.current_id(), None);
    }

    #[test]
    fn partial_cache_entry_merges_over_configured_year() {
        let cache = MemoryCache::new();
        cache.set(CACHE_KEY, r#"{"name":"Old draft"}"#).unwrap();
        let wizard = Wizard::new("2031", AdvancePolicy::Free).with_cache(Box::new(cache));
        assert_eq!(wizard.text(TextField::Name), "Old draft");
        assert_eq!(wizard.text(TextField::Year), "2031");
    }

    #[test]
    fn corrupt_cache_entry_is_ignored() {
        let cache = MemoryCache::new();
        cache.set(CACHE_KEY, "{not json").unwrap();
        let wizard = Wizard::new("2026", AdvancePolicy::Free).with_cache(Box::new(cache));
        assert_eq!(**wizard.record(), Record::new("2026"));
    }

    #[test]
    fn broken_cache_never_interrupts_editing() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free).with_cache(Box::new(BrokenCache));
        wizard.set_text(TextField::Name, "Still works");
        wizard.reset();
        wizard.set_text(TextField::FinalNotes, "ok");
        assert_eq!(wizard.text(TextField::FinalNotes), "ok");
    }

    #[test]
    fn every_step_field_round_trips() {
        let mut wizard = Wizard::new("2026", AdvancePolicy::Free);
        for step in Step::ALL {
            for field in step.fields() {
                wizard.set_text(*field, format!("{}-value", field.key()));
                assert_eq!(wizard.text(*field), format!("{}-value", field.key()));
            }
        }
        assert_eq!(TextField::from_key("WHATWOULDBENEEDED"), Some(TextField::WhatWouldBeNeeded));
    }
}
