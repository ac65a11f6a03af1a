use crate::store::models::SessionRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteSessionRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::SessionRepository for SqliteSessionRepository<'conn> {
    fn create(&self, record: &SessionRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions (token, user_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.token, record.user_id, record.created_at],
        )?;
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<SessionRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT token, user_id, created_at
                FROM sessions
                WHERE token = ?1
                "#,
                params![token],
                |row| {
                    Ok(SessionRecord {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete(&self, token: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    fn delete_for_user(&self, user_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        Ok(())
    }
}
