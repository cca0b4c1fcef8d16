//! Notification repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Listing is newest first, then by id for a stable order.
//! - Read-state changes are scoped to the recipient; marking someone else's
//!   notification is reported as not found.

use crate::model::notification::{Notification, NotificationId, NotificationKind, RelatedType};
use crate::model::person::PersonId;
use crate::repo::person_repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Page size used when callers do not ask for one.
pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 20;

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    recipient_id,
    title,
    message,
    kind,
    related_type,
    related_id,
    is_read,
    created_at
FROM notifications";

pub trait NotificationRepository {
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId>;
    fn list_for_recipient(&self, recipient_id: PersonId, limit: u32)
        -> RepoResult<Vec<Notification>>;
    fn unread_count(&self, recipient_id: PersonId) -> RepoResult<u64>;
    fn mark_read(&self, recipient_id: PersonId, id: NotificationId) -> RepoResult<()>;
    /// Returns how many notifications changed state.
    fn mark_all_read(&self, recipient_id: PersonId) -> RepoResult<u64>;
}

#[derive(Clone, Copy)]
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId> {
        notification.validate()?;

        self.conn.execute(
            "INSERT INTO notifications (
                id,
                recipient_id,
                title,
                message,
                kind,
                related_type,
                related_id,
                is_read
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                notification.id.to_string(),
                notification.recipient_id.to_string(),
                notification.title.as_str(),
                notification.message.as_str(),
                notification.kind.as_str(),
                notification.related_type.map(RelatedType::as_str),
                notification.related_id.map(|id| id.to_string()),
                i64::from(notification.is_read),
            ],
        )?;

        Ok(notification.id)
    }

    fn list_for_recipient(
        &self,
        recipient_id: PersonId,
        limit: u32,
    ) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL}
             WHERE recipient_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![recipient_id.to_string(), i64::from(limit)])?;
        let mut notifications = Vec::new();

        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }

        Ok(notifications)
    }

    fn unread_count(&self, recipient_id: PersonId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0;",
            [recipient_id.to_string()],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative unread count `{count}`")))
    }

    fn mark_read(&self, recipient_id: PersonId, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2;",
            params![id.to_string(), recipient_id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn mark_all_read(&self, recipient_id: PersonId) -> RepoResult<u64> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0;",
            [recipient_id.to_string()],
        )?;
        Ok(changed as u64)
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let kind_text: String = row.get("kind")?;
    let kind = NotificationKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid kind `{kind_text}` in notifications.kind"))
    })?;

    let related_type = match row.get::<_, Option<String>>("related_type")? {
        Some(text) => Some(RelatedType::parse(&text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid related type `{text}` in notifications.related_type"
            ))
        })?),
        None => None,
    };

    let related_id = match row.get::<_, Option<String>>("related_id")? {
        Some(text) => Some(parse_uuid(&text, "notifications.related_id")?),
        None => None,
    };

    let is_read = match row.get::<_, i64>("is_read")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_read value `{other}` in notifications.is_read"
            )));
        }
    };

    Ok(Notification {
        id: parse_uuid(&row.get::<_, String>("id")?, "notifications.id")?,
        recipient_id: parse_uuid(
            &row.get::<_, String>("recipient_id")?,
            "notifications.recipient_id",
        )?,
        title: row.get("title")?,
        message: row.get("message")?,
        kind,
        related_type,
        related_id,
        is_read,
        created_at: row.get("created_at")?,
    })
}
