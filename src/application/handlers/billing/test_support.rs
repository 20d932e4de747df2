//! Fixtures shared by the billing handler tests.

use crate::domain::foundation::AccountId;

pub fn account(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}
