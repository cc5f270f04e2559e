use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarbageType {
    Paper,
    Plastic,
    Glass,
    Metal,
    Organic,
    Mixed,
}

impl GarbageType {
    pub const ALL: [GarbageType; 6] = [
        GarbageType::Paper,
        GarbageType::Plastic,
        GarbageType::Glass,
        GarbageType::Metal,
        GarbageType::Organic,
        GarbageType::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GarbageType::Paper => "paper",
            GarbageType::Plastic => "plastic",
            GarbageType::Glass => "glass",
            GarbageType::Metal => "metal",
            GarbageType::Organic => "organic",
            GarbageType::Mixed => "mixed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Once,
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|frequency| frequency.as_str() == raw)
    }
}

/// One pickup event at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub garbage_type: GarbageType,
    pub location: String,
    pub footnote: String,
    pub frequency: Frequency,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub date_added: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub garbage_type: GarbageType,
    pub location: String,
    #[serde(default)]
    pub footnote: String,
    pub frequency: Frequency,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl ScheduleInput {
    pub fn into_schedule(self, id: String, now: OffsetDateTime) -> Schedule {
        Schedule {
            id,
            garbage_type: self.garbage_type,
            location: self.location,
            footnote: self.footnote,
            frequency: self.frequency,
            date: self.date,
            date_added: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub location: Option<String>,
    pub garbage_type: Option<GarbageType>,
    pub frequency: Option<Frequency>,
}

impl ScheduleFilter {
    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.location
            .as_deref()
            .is_none_or(|location| schedule.location == location)
            && self
                .garbage_type
                .is_none_or(|kind| schedule.garbage_type == kind)
            && self
                .frequency
                .is_none_or(|frequency| schedule.frequency == frequency)
    }
}
