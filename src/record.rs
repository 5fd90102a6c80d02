// proposal-pdf: workshop proposal record model

use serde::{Deserialize, Serialize};

/// Year stamped on new proposals when no configuration overrides it.
pub const DEFAULT_YEAR: &str = "2026";

// ============================================================================
// Record
// ============================================================================

/// One workshop proposal as edited in the wizard.
///
/// Every field defaults, so a partial JSON document (an old cache entry, a
/// store document missing newer fields) deserializes as a merge over the
/// empty record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Record {
    pub year: String,
    pub name: String,
    pub rationale: String,
    pub objectives: String,
    pub audience: Audience,
    pub axes: String,
    pub capacity: Capacity,
    pub responsible_parties: String,
    pub sequence: Sequence,
    pub resources: String,
    pub logistics: String,
    pub accessibility: Accessibility,
    pub spaces: String,
    pub integration: String,
    pub final_notes: String,
}

impl Default for Record {
    fn default() -> Self {
        Record::new(DEFAULT_YEAR)
    }
}

impl Record {
    /// Empty proposal for the given year.
    pub fn new(year: impl Into<String>) -> Self {
        Record {
            year: year.into(),
            name: String::new(),
            rationale: String::new(),
            objectives: String::new(),
            audience: Audience::default(),
            axes: String::new(),
            capacity: Capacity::default(),
            responsible_parties: String::new(),
            sequence: Sequence::default(),
            resources: String::new(),
            logistics: String::new(),
            accessibility: Accessibility::default(),
            spaces: String::new(),
            integration: String::new(),
            final_notes: String::new(),
        }
    }

    /// Returns a new record with `patch` applied; `self` is left untouched.
    pub fn update(&self, patch: impl FnOnce(&mut Record)) -> Record {
        let mut next = self.clone();
        patch(&mut next);
        next
    }

    /// True when the name is present after trimming.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Overlays the top-level keys of a JSON object onto `self`. Keys absent
    /// from `json` keep their current values.
    pub fn merged_from_json(&self, json: &str) -> Result<Record, serde_json::Error> {
        let mut merged = serde_json::to_value(self)?;
        let overlay: serde_json::Value = serde_json::from_str(json)?;
        if let (Some(target), serde_json::Value::Object(fields)) = (merged.as_object_mut(), overlay) {
            target.extend(fields);
        }
        serde_json::from_value(merged)
    }
}

// ============================================================================
// Audience
// ============================================================================

/// Target audience groups, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudienceGroup {
    Infants,
    Children,
    Teens,
    YoungAdults,
    OlderAdults,
}

impl AudienceGroup {
    pub const ALL: [AudienceGroup; 5] = [
        AudienceGroup::Infants,
        AudienceGroup::Children,
        AudienceGroup::Teens,
        AudienceGroup::YoungAdults,
        AudienceGroup::OlderAdults,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AudienceGroup::Infants => "infants",
            AudienceGroup::Children => "children",
            AudienceGroup::Teens => "teens",
            AudienceGroup::YoungAdults => "youngAdults",
            AudienceGroup::OlderAdults => "olderAdults",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AudienceGroup::Infants => "Infants",
            AudienceGroup::Children => "Children",
            AudienceGroup::Teens => "Teens",
            AudienceGroup::YoungAdults => "Young adults (18+)",
            AudienceGroup::OlderAdults => "Older adults",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.key().eq_ignore_ascii_case(key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Audience {
    pub infants: bool,
    pub children: bool,
    pub teens: bool,
    pub young_adults: bool,
    pub older_adults: bool,
    pub clarifications: String,
}

impl Audience {
    pub fn is_selected(&self, group: AudienceGroup) -> bool {
        match group {
            AudienceGroup::Infants => self.infants,
            AudienceGroup::Children => self.children,
            AudienceGroup::Teens => self.teens,
            AudienceGroup::YoungAdults => self.young_adults,
            AudienceGroup::OlderAdults => self.older_adults,
        }
    }

    pub fn toggle(&mut self, group: AudienceGroup) {
        let flag = match group {
            AudienceGroup::Infants => &mut self.infants,
            AudienceGroup::Children => &mut self.children,
            AudienceGroup::Teens => &mut self.teens,
            AudienceGroup::YoungAdults => &mut self.young_adults,
            AudienceGroup::OlderAdults => &mut self.older_adults,
        };
        *flag = !*flag;
    }

    /// Selected groups in enumeration order.
    pub fn selected(&self) -> impl Iterator<Item = AudienceGroup> + '_ {
        AudienceGroup::ALL.into_iter().filter(|g| self.is_selected(*g))
    }
}

// ============================================================================
// Capacity and Sequence
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacity {
    pub headcount: String,
    pub duration: String,
}

/// The three moments of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequence {
    pub opening: String,
    pub development: String,
    pub closing: String,
}

// ============================================================================
// Accessibility
// ============================================================================

/// Single choice; unset until the proposer answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanBeAdapted {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "no")]
    No,
}

impl CanBeAdapted {
    /// "Yes"/"No", empty when unset.
    pub fn label(self) -> &'static str {
        match self {
            CanBeAdapted::Unset => "",
            CanBeAdapted::Yes => "Yes",
            CanBeAdapted::No => "No",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Some(CanBeAdapted::Yes),
            "no" | "n" => Some(CanBeAdapted::No),
            "" | "unset" => Some(CanBeAdapted::Unset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisabilityType {
    Motor,
    Visual,
    Auditory,
    Intellectual,
    Psychosocial,
}

impl DisabilityType {
    pub const ALL: [DisabilityType; 5] = [
        DisabilityType::Motor,
        DisabilityType::Visual,
        DisabilityType::Auditory,
        DisabilityType::Intellectual,
        DisabilityType::Psychosocial,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DisabilityType::Motor => "motor",
            DisabilityType::Visual => "visual",
            DisabilityType::Auditory => "auditory",
            DisabilityType::Intellectual => "intellectual",
            DisabilityType::Psychosocial => "psychosocial",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisabilityType::Motor => "Motor",
            DisabilityType::Visual => "Visual",
            DisabilityType::Auditory => "Auditory",
            DisabilityType::Intellectual => "Intellectual",
            DisabilityType::Psychosocial => "Psychosocial",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key().eq_ignore_ascii_case(key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisabilityTypes {
    pub motor: bool,
    pub visual: bool,
    pub auditory: bool,
    pub intellectual: bool,
    pub psychosocial: bool,
    pub other: String,
}

impl DisabilityTypes {
    pub fn is_selected(&self, kind: DisabilityType) -> bool {
        match kind {
            DisabilityType::Motor => self.motor,
            DisabilityType::Visual => self.visual,
            DisabilityType::Auditory => self.auditory,
            DisabilityType::Intellectual => self.intellectual,
            DisabilityType::Psychosocial => self.psychosocial,
        }
    }

    pub fn toggle(&mut self, kind: DisabilityType) {
        let flag = match kind {
            DisabilityType::Motor => &mut self.motor,
            DisabilityType::Visual => &mut self.visual,
            DisabilityType::Auditory => &mut self.auditory,
            DisabilityType::Intellectual => &mut self.intellectual,
            DisabilityType::Psychosocial => &mut self.psychosocial,
        };
        *flag = !*flag;
    }

    pub fn selected(&self) -> impl Iterator<Item = DisabilityType> + '_ {
        DisabilityType::ALL.into_iter().filter(|d| self.is_selected(*d))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Accessibility {
    pub can_be_adapted: CanBeAdapted,
    pub disability_types: DisabilityTypes,
    pub what_would_be_needed: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_empty_with_year() {
        let record = Record::new("2027");
        assert_eq!(record.year, "2027");
        assert!(!record.has_name());
        assert_eq!(record.audience.selected().count(), 0);
        assert_eq!(record.accessibility.can_be_adapted, CanBeAdapted::Unset);
    }

    #[test]
    fn update_returns_new_value_and_keeps_original() {
        let original = Record::default();
        let next = original.update(|r| r.name = "Nature Workshop".to_string());
        assert_eq!(original.name, "");
        assert_eq!(next.name, "Nature Workshop");
        assert_eq!(next.year, original.year);
    }

    #[test]
    fn whitespace_name_does_not_count() {
        let record = Record::default().update(|r| r.name = "   \t".to_string());
        assert!(!record.has_name());
    }

    #[test]
    fn toggles_are_independent() {
        let mut audience = Audience::default();
        audience.toggle(AudienceGroup::Teens);
        audience.toggle(AudienceGroup::Infants);
        audience.toggle(AudienceGroup::OlderAdults);
        audience.toggle(AudienceGroup::OlderAdults);
        let selected: Vec<_> = audience.selected().collect();
        assert_eq!(selected, vec![AudienceGroup::Infants, AudienceGroup::Teens]);
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let json = r#"{"name":"Clay","capacity":{"headcount":"12"},"accessibility":{"canBeAdapted":"yes"}}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Clay");
        assert_eq!(record.year, DEFAULT_YEAR);
        assert_eq!(record.capacity.headcount, "12");
        assert_eq!(record.capacity.duration, "");
        assert_eq!(record.accessibility.can_be_adapted, CanBeAdapted::Yes);
    }

    #[test]
    fn json_overlay_keeps_absent_keys() {
        let base = Record::new("2031").update(|r| r.axes = "art".into());
        let merged = base.merged_from_json(r#"{"name":"Clay","axes":""}"#).unwrap();
        assert_eq!(merged.year, "2031");
        assert_eq!(merged.name, "Clay");
        assert_eq!(merged.axes, "");
        assert!(base.merged_from_json("[1, 2]").is_ok());
        assert!(base.merged_from_json("{oops").is_err());
    }

    #[test]
    fn serializes_camel_case_keys() {
        let record = Record::default().update(|r| {
            r.final_notes = "done".to_string();
            r.audience.young_adults = true;
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["finalNotes"], "done");
        assert_eq!(value["audience"]["youngAdults"], true);
        assert_eq!(value["accessibility"]["canBeAdapted"], "");
    }

    #[test]
    fn keys_parse_case_insensitively() {
        assert_eq!(AudienceGroup::from_key("youngadults"), Some(AudienceGroup::YoungAdults));
        assert_eq!(DisabilityType::from_key("Visual"), Some(DisabilityType::Visual));
        assert_eq!(CanBeAdapted::from_key("NO"), Some(CanBeAdapted::No));
        assert_eq!(CanBeAdapted::from_key("maybe"), None);
    }
}
