use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lendledger_core::{AggregateRoot, DomainError};

lendledger_core::typed_id!(
    /// Borrower identifier.
    BorrowerId
);

/// Membership category; selects the lending policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorrowerClass {
    Student,
    Teacher,
    Staff,
}

impl BorrowerClass {
    pub const ALL: [BorrowerClass; 3] = [
        BorrowerClass::Student,
        BorrowerClass::Teacher,
        BorrowerClass::Staff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BorrowerClass::Student => "Student",
            BorrowerClass::Teacher => "Teacher",
            BorrowerClass::Staff => "Staff",
        }
    }
}

impl core::fmt::Display for BorrowerClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for BorrowerClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        BorrowerClass::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown borrower class '{trimmed}' (expected Student, Teacher or Staff)"
                ))
            })
    }
}

/// Borrower status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorrowerStatus {
    Active,
    Inactive,
    Suspended,
}

/// Descriptive fields shown next to a loan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BorrowerProfile {
    /// Library-facing membership number (distinct from the record id).
    pub member_code: String,
    pub full_name: String,
    pub email: Option<String>,
}

/// A registered borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    id: BorrowerId,
    profile: BorrowerProfile,
    class: BorrowerClass,
    status: BorrowerStatus,
    version: u64,
    created_at: DateTime<Utc>,
}

impl Borrower {
    pub fn new(
        id: BorrowerId,
        profile: BorrowerProfile,
        class: BorrowerClass,
        status: BorrowerStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            profile,
            class,
            status,
            version: 0,
            created_at: now,
        }
    }

    pub fn id_typed(&self) -> BorrowerId {
        self.id
    }

    pub fn profile(&self) -> &BorrowerProfile {
        &self.profile
    }

    pub fn class(&self) -> BorrowerClass {
        self.class
    }

    pub fn status(&self) -> BorrowerStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Only active borrowers may take new loans.
    pub fn can_borrow(&self) -> bool {
        self.status == BorrowerStatus::Active
    }

    pub fn set_status(&mut self, status: BorrowerStatus) {
        self.status = status;
    }

    /// Store-owned revision stamp.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl AggregateRoot for Borrower {
    type Id = BorrowerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
