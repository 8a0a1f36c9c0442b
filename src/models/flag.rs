use serde::{Deserialize, Serialize};

/// A persisted onboarding prerequisite.
///
/// Flags are written by the wizard flows (company profile, entity creation,
/// entity verification) and only ever read by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Flag {
    CompanyProfileDone,
    EntityCreated,
    EntityVerified,
}

impl Flag {
    pub const ALL: [Flag; 3] = [
        Flag::CompanyProfileDone,
        Flag::EntityCreated,
        Flag::EntityVerified,
    ];

    /// Key under which the flag is persisted
    pub fn key(&self) -> &'static str {
        match self {
            Flag::CompanyProfileDone => "companyProfileDone",
            Flag::EntityCreated => "entityCreated",
            Flag::EntityVerified => "entityVerified",
        }
    }

    /// Parse a flag name. Accepts the persisted key as well as
    /// snake_case and kebab-case spellings, case-insensitively.
    pub fn from_key(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|flag| flag.key().to_lowercase() == normalized)
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Snapshot of all onboarding flags at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagSet {
    pub company_profile_done: bool,
    pub entity_created: bool,
    pub entity_verified: bool,
}

impl FlagSet {
    pub fn new(company_profile_done: bool, entity_created: bool, entity_verified: bool) -> Self {
        Self {
            company_profile_done,
            entity_created,
            entity_verified,
        }
    }

    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::CompanyProfileDone => self.company_profile_done,
            Flag::EntityCreated => self.entity_created,
            Flag::EntityVerified => self.entity_verified,
        }
    }

    /// Copy with one flag replaced
    pub fn with(mut self, flag: Flag, value: bool) -> Self {
        match flag {
            Flag::CompanyProfileDone => self.company_profile_done = value,
            Flag::EntityCreated => self.entity_created = value,
            Flag::EntityVerified => self.entity_verified = value,
        }
        self
    }

    /// Every combination of the three flags (used by property checks)
    pub fn all_combinations() -> Vec<FlagSet> {
        (0u8..8)
            .map(|bits| FlagSet::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0))
            .collect()
    }
}

/// A raw stored flag value as listed by `ontrack flags`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub key: String,
    /// `None` when the stored value is not a boolean
    pub value: Option<bool>,
    pub modified_ts: Option<i64>,
}

/// One write to the flag store, as kept in the history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEvent {
    pub id: i64,
    pub key: String,
    /// `None` records a removal
    pub value: Option<bool>,
    pub ts: i64,
}
