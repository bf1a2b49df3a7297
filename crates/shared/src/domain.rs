use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownEntity;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RecordId);

/// Every record collection the administration dashboard manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organisation,
    User,
    Person,
    Batch,
    Course,
    Payment,
    Receipt,
}

/// How a store stamps `createdAt` / `updatedAt` on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// `createdAt` and `updatedAt` as `YYYY-MM-DD`; `updatedAt` refreshed on update.
    CalendarDate,
    /// `createdAt` as an RFC 3339 instant, set once.
    CreatedInstant,
    None,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Organisation,
        EntityKind::User,
        EntityKind::Person,
        EntityKind::Batch,
        EntityKind::Course,
        EntityKind::Payment,
        EntityKind::Receipt,
    ];

    /// Collection name used for REST paths and store partitioning.
    pub fn resource(self) -> &'static str {
        match self {
            EntityKind::Organisation => "organisations",
            EntityKind::User => "users",
            EntityKind::Person => "persons",
            EntityKind::Batch => "batches",
            EntityKind::Course => "courses",
            EntityKind::Payment => "payments",
            EntityKind::Receipt => "receipts",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            EntityKind::Organisation => "organisation",
            EntityKind::User => "user",
            EntityKind::Person => "person",
            EntityKind::Batch => "batch",
            EntityKind::Course => "course",
            EntityKind::Payment => "payment",
            EntityKind::Receipt => "receipt",
        }
    }

    pub fn timestamp_policy(self) -> TimestampPolicy {
        match self {
            EntityKind::Organisation | EntityKind::Batch | EntityKind::Course => {
                TimestampPolicy::CalendarDate
            }
            EntityKind::User | EntityKind::Payment | EntityKind::Receipt => {
                TimestampPolicy::CreatedInstant
            }
            EntityKind::Person => TimestampPolicy::None,
        }
    }

    pub fn from_resource(resource: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.resource() == resource)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntity;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let needle = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.resource() == needle || kind.singular() == needle)
            .ok_or_else(|| UnknownEntity(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_and_singular_names() {
        assert_eq!("batches".parse::<EntityKind>(), Ok(EntityKind::Batch));
        assert_eq!("Person".parse::<EntityKind>(), Ok(EntityKind::Person));
        assert_eq!(" RECEIPTS ".parse::<EntityKind>(), Ok(EntityKind::Receipt));
        let err = "ledgers".parse::<EntityKind>().expect_err("unknown");
        assert_eq!(err, UnknownEntity("ledgers".to_string()));
        assert_eq!(err.to_string(), "unknown entity 'ledgers'");
    }

    #[test]
    fn resource_lookup_is_exact() {
        assert_eq!(
            EntityKind::from_resource("organisations"),
            Some(EntityKind::Organisation)
        );
        assert_eq!(EntityKind::from_resource("Organisations"), None);
    }

    #[test]
    fn record_id_serializes_as_plain_integer() {
        let raw = serde_json::to_string(&RecordId(7)).expect("json");
        assert_eq!(raw, "7");
    }
}
