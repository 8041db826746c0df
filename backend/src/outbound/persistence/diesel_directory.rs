//! PostgreSQL-backed item and user directories.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{DirectoryError, ItemDirectory, ItemSummary, UserDirectory};
use crate::domain::{EmailAddress, UserContact, UserId};

use super::diesel_helpers::{DieselFailure, classify_diesel_error};
use super::models::{ItemRow, UserContactRow};
use super::pool::{DbPool, PoolError};
use super::schema::{items, users};

/// Read-only lookups over `items` and `users`.
#[derive(Clone)]
pub struct DieselDirectory {
    pool: DbPool,
}

impl DieselDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> DirectoryError {
    DirectoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> DirectoryError {
    match classify_diesel_error(error, "directory") {
        DieselFailure::Connection => DirectoryError::connection("database connection error"),
        DieselFailure::UniqueViolation { .. } => DirectoryError::query("unexpected unique violation"),
        DieselFailure::Query(message) => DirectoryError::query(message),
    }
}

fn row_to_contact(row: UserContactRow) -> UserContact {
    UserContact {
        user_id: UserId::from_uuid(row.id),
        display_name: row.display_name,
        // A stored address that no longer validates is treated as unreachable.
        email: row.email.and_then(|raw| EmailAddress::new(raw).ok()),
        phone: row.phone.filter(|phone| !phone.trim().is_empty()),
    }
}

#[async_trait]
impl ItemDirectory for DieselDirectory {
    async fn find_item(&self, item_id: &Uuid) -> Result<Option<ItemSummary>, DirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = items::table
            .find(item_id)
            .select(ItemRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(|row| ItemSummary {
            id: row.id,
            owner_id: UserId::from_uuid(row.owner_id),
            title: row.title,
        }))
    }
}

#[async_trait]
impl UserDirectory for DieselDirectory {
    async fn find_contact(&self, user_id: &UserId) -> Result<Option<UserContact>, DirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .find(user_id.as_uuid())
            .select(UserContactRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_contact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("n@example.org"), true)]
    #[case(Some("broken"), false)]
    #[case(None, false)]
    fn invalid_stored_emails_are_dropped(#[case] email: Option<&str>, #[case] kept: bool) {
        let contact = row_to_contact(UserContactRow {
            id: Uuid::new_v4(),
            display_name: "N".to_owned(),
            email: email.map(str::to_owned),
            phone: Some("  ".to_owned()),
        });
        assert_eq!(contact.email.is_some(), kept);
        assert_eq!(contact.phone, None);
    }
}
