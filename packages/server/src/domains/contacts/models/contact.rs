use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{ContactId, ContactListId, UserId};
use crate::kernel::BaseContactStore;

/// Address-book entry owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: ContactId,
    pub user_id: UserId,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named group of contacts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactList {
    pub id: ContactListId,
    pub user_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ContactListWithContacts {
    pub list: ContactList,
    pub contacts: Vec<Contact>,
}

impl Contact {
    /// Find contacts by id. Missing ids are simply absent from the result.
    pub async fn find_by_ids(ids: &[ContactId], pool: &PgPool) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        let contacts =
            sqlx::query_as::<_, Self>("SELECT * FROM user_contacts WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(pool)
                .await?;
        Ok(contacts)
    }

    /// Members of a contact list, in the order they were added
    pub async fn find_by_list(list_id: ContactListId, pool: &PgPool) -> Result<Vec<Self>> {
        let contacts = sqlx::query_as::<_, Self>(
            r#"
            SELECT c.*
            FROM user_contacts c
            INNER JOIN contact_list_contacts lc ON lc.user_contact_id = c.id
            WHERE lc.contact_list_id = $1
            ORDER BY lc.added_at ASC, c.id ASC
            "#,
        )
        .bind(list_id)
        .fetch_all(pool)
        .await?;
        Ok(contacts)
    }
}

impl ContactList {
    pub async fn find_by_id_optional(id: ContactListId, pool: &PgPool) -> Result<Option<Self>> {
        let list = sqlx::query_as::<_, Self>("SELECT * FROM contact_lists WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(list)
    }
}

/// Postgres-backed BaseContactStore
#[derive(Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseContactStore for PgContactStore {
    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>> {
        Contact::find_by_ids(ids, &self.pool).await
    }

    async fn find_list_with_contacts(
        &self,
        id: ContactListId,
    ) -> Result<Option<ContactListWithContacts>> {
        let Some(list) = ContactList::find_by_id_optional(id, &self.pool).await? else {
            return Ok(None);
        };
        let contacts = Contact::find_by_list(id, &self.pool).await?;
        Ok(Some(ContactListWithContacts { list, contacts }))
    }
}
