//! Message repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Inbox listing is newest first; conversations are oldest first.
//! - A broadcast batch is inserted in one transaction: all rows or none.
//! - Read-state changes are scoped to the receiver.

use crate::model::message::{Message, MessageId};
use crate::model::person::PersonId;
use crate::repo::person_repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

/// Page size used when callers do not ask for one.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 100;

const MESSAGE_SELECT_SQL: &str = "SELECT
    id,
    sender_id,
    receiver_id,
    content,
    is_broadcast,
    is_read,
    created_at
FROM messages";

const MESSAGE_INSERT_SQL: &str = "INSERT INTO messages (
    id,
    sender_id,
    receiver_id,
    content,
    is_broadcast,
    is_read
) VALUES (?1, ?2, ?3, ?4, ?5, ?6);";

pub trait MessageRepository {
    fn create_message(&self, message: &Message) -> RepoResult<MessageId>;
    /// Inserts every message or none of them.
    fn create_messages(&self, messages: &[Message]) -> RepoResult<usize>;
    /// Messages sent or received by `person_id`, newest first.
    fn list_for_person(&self, person_id: PersonId, limit: u32) -> RepoResult<Vec<Message>>;
    /// Messages exchanged between two people, oldest first.
    fn conversation(&self, person_id: PersonId, other_id: PersonId) -> RepoResult<Vec<Message>>;
    fn unread_count(&self, receiver_id: PersonId) -> RepoResult<u64>;
    fn mark_read(&self, receiver_id: PersonId, id: MessageId) -> RepoResult<()>;
    /// Marks everything `sender_id` sent to `receiver_id` as read.
    fn mark_conversation_read(&self, receiver_id: PersonId, sender_id: PersonId)
        -> RepoResult<u64>;
}

impl<T: MessageRepository + ?Sized> MessageRepository for &T {
    fn create_message(&self, message: &Message) -> RepoResult<MessageId> {
        (**self).create_message(message)
    }

    fn create_messages(&self, messages: &[Message]) -> RepoResult<usize> {
        (**self).create_messages(messages)
    }

    fn list_for_person(&self, person_id: PersonId, limit: u32) -> RepoResult<Vec<Message>> {
        (**self).list_for_person(person_id, limit)
    }

    fn conversation(&self, person_id: PersonId, other_id: PersonId) -> RepoResult<Vec<Message>> {
        (**self).conversation(person_id, other_id)
    }

    fn unread_count(&self, receiver_id: PersonId) -> RepoResult<u64> {
        (**self).unread_count(receiver_id)
    }

    fn mark_read(&self, receiver_id: PersonId, id: MessageId) -> RepoResult<()> {
        (**self).mark_read(receiver_id, id)
    }

    fn mark_conversation_read(
        &self,
        receiver_id: PersonId,
        sender_id: PersonId,
    ) -> RepoResult<u64> {
        (**self).mark_conversation_read(receiver_id, sender_id)
    }
}

#[derive(Clone, Copy)]
pub struct SqliteMessageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMessageRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_messages(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Message>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut messages = Vec::new();

        while let Some(row) = rows.next()? {
            messages.push(parse_message_row(row)?);
        }

        Ok(messages)
    }
}

impl MessageRepository for SqliteMessageRepository<'_> {
    fn create_message(&self, message: &Message) -> RepoResult<MessageId> {
        message.validate()?;
        insert_message(self.conn, message)?;
        Ok(message.id)
    }

    fn create_messages(&self, messages: &[Message]) -> RepoResult<usize> {
        for message in messages {
            message.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for message in messages {
            insert_message(&tx, message)?;
        }
        tx.commit()?;

        Ok(messages.len())
    }

    fn list_for_person(&self, person_id: PersonId, limit: u32) -> RepoResult<Vec<Message>> {
        self.query_messages(
            &format!(
                "{MESSAGE_SELECT_SQL}
                 WHERE sender_id = ?1 OR receiver_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2;"
            ),
            params![person_id.to_string(), i64::from(limit)],
        )
    }

    fn conversation(&self, person_id: PersonId, other_id: PersonId) -> RepoResult<Vec<Message>> {
        self.query_messages(
            &format!(
                "{MESSAGE_SELECT_SQL}
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            params![person_id.to_string(), other_id.to_string()],
        )
    }

    fn unread_count(&self, receiver_id: PersonId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = 0;",
            [receiver_id.to_string()],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative unread count `{count}`")))
    }

    fn mark_read(&self, receiver_id: PersonId, id: MessageId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE messages SET is_read = 1 WHERE id = ?1 AND receiver_id = ?2;",
            params![id.to_string(), receiver_id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn mark_conversation_read(
        &self,
        receiver_id: PersonId,
        sender_id: PersonId,
    ) -> RepoResult<u64> {
        let changed = self.conn.execute(
            "UPDATE messages
             SET is_read = 1
             WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = 0;",
            params![receiver_id.to_string(), sender_id.to_string()],
        )?;
        Ok(changed as u64)
    }
}

fn insert_message(conn: &Connection, message: &Message) -> RepoResult<()> {
    conn.execute(
        MESSAGE_INSERT_SQL,
        params![
            message.id.to_string(),
            message.sender_id.to_string(),
            message.receiver_id.to_string(),
            message.content.as_str(),
            i64::from(message.is_broadcast),
            i64::from(message.is_read),
        ],
    )?;
    Ok(())
}

fn parse_message_row(row: &Row<'_>) -> RepoResult<Message> {
    Ok(Message {
        id: parse_uuid(&row.get::<_, String>("id")?, "messages.id")?,
        sender_id: parse_uuid(&row.get::<_, String>("sender_id")?, "messages.sender_id")?,
        receiver_id: parse_uuid(&row.get::<_, String>("receiver_id")?, "messages.receiver_id")?,
        content: row.get("content")?,
        is_broadcast: parse_flag(row.get("is_broadcast")?, "messages.is_broadcast")?,
        is_read: parse_flag(row.get("is_read")?, "messages.is_read")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}
