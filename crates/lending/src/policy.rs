//! Lending policy by borrower class.

use std::collections::HashMap;

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lendledger_borrowers::BorrowerClass;

/// Rules for one borrower class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingLimits {
    pub max_active_loans: u32,
    pub loan_duration_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The table has no entry for this class. Configuration error, not user input.
    #[error("no lending policy configured for borrower class {0}")]
    UnknownClass(BorrowerClass),

    #[error("due date out of range: {0} + {1} days")]
    DateOutOfRange(DateTime<Utc>, u32),
}

/// Class → limits mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    rules: HashMap<BorrowerClass, LendingLimits>,
}

impl Default for PolicyTable {
    /// Student: 3 loans / 14 days. Teacher and Staff: 5 loans / 30 days.
    fn default() -> Self {
        Self::empty()
            .with_rule(
                BorrowerClass::Student,
                LendingLimits {
                    max_active_loans: 3,
                    loan_duration_days: 14,
                },
            )
            .with_rule(
                BorrowerClass::Teacher,
                LendingLimits {
                    max_active_loans: 5,
                    loan_duration_days: 30,
                },
            )
            .with_rule(
                BorrowerClass::Staff,
                LendingLimits {
                    max_active_loans: 5,
                    loan_duration_days: 30,
                },
            )
    }
}

impl PolicyTable {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add or replace the rule for `class`.
    pub fn with_rule(mut self, class: BorrowerClass, limits: LendingLimits) -> Self {
        self.rules.insert(class, limits);
        self
    }

    pub fn set_rule(&mut self, class: BorrowerClass, limits: LendingLimits) {
        self.rules.insert(class, limits);
    }

    pub fn limits(&self, class: BorrowerClass) -> Result<LendingLimits, PolicyError> {
        self.rules
            .get(&class)
            .copied()
            .ok_or(PolicyError::UnknownClass(class))
    }

    /// `checkout_date` plus the class's loan duration in calendar days.
    pub fn due_date(
        &self,
        checkout_date: DateTime<Utc>,
        class: BorrowerClass,
    ) -> Result<DateTime<Utc>, PolicyError> {
        let days = self.limits(class)?.loan_duration_days;
        checkout_date
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or(PolicyError::DateOutOfRange(checkout_date, days))
    }
}
