use crate::store::models::PendingDeletionRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteDeletionRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::DeletionRepository for SqliteDeletionRepository<'conn> {
    fn upsert(&self, record: &PendingDeletionRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO pending_deletions
                (uid, email, requested_at, scheduled_permanent_deletion_at, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(uid) DO UPDATE SET
                email = excluded.email,
                requested_at = excluded.requested_at,
                scheduled_permanent_deletion_at = excluded.scheduled_permanent_deletion_at,
                status = excluded.status
            "#,
            params![
                record.uid,
                record.email,
                record.requested_at,
                record.scheduled_permanent_deletion_at,
                record.status
            ],
        )?;
        Ok(())
    }

    fn get(&self, uid: &str) -> Result<Option<PendingDeletionRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT uid, email, requested_at, scheduled_permanent_deletion_at, status
                FROM pending_deletions
                WHERE uid = ?1
                "#,
                params![uid],
                |row| {
                    Ok(PendingDeletionRecord {
                        uid: row.get(0)?,
                        email: row.get(1)?,
                        requested_at: row.get(2)?,
                        scheduled_permanent_deletion_at: row.get(3)?,
                        status: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    fn remove(&self, uid: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM pending_deletions WHERE uid = ?1", params![uid])?;
        Ok(())
    }
}
