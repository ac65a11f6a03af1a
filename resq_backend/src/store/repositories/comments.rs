use crate::store::models::CommentRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteCommentRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::CommentRepository for SqliteCommentRepository<'conn> {
    fn append(&self, record: &CommentRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO post_comments (id, post_id, user_id, user_name, text, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.post_id,
                record.user_id,
                record.user_name,
                record.text,
                record.timestamp
            ],
        )?;
        Ok(())
    }

    fn get(&self, post_id: &str, comment_id: &str) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, post_id, user_id, user_name, text, timestamp
                FROM post_comments
                WHERE post_id = ?1 AND id = ?2
                "#,
                params![post_id, comment_id],
                |row| {
                    Ok(CommentRecord {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        user_id: row.get(2)?,
                        user_name: row.get(3)?,
                        text: row.get(4)?,
                        timestamp: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    fn list_for_post(&self, post_id: &str) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, post_id, user_id, user_name, text, timestamp
            FROM post_comments
            WHERE post_id = ?1
            ORDER BY timestamp ASC, id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id], |row| {
            Ok(CommentRecord {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                user_name: row.get(3)?,
                text: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn set_text(&self, post_id: &str, comment_id: &str, text: &str) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE post_comments
            SET text = ?3
            WHERE post_id = ?1 AND id = ?2
            "#,
            params![post_id, comment_id, text],
        )?;
        Ok(())
    }

    fn remove_exact(&self, record: &CommentRecord) -> Result<usize> {
        let removed = self.conn.execute(
            r#"
            DELETE FROM post_comments
            WHERE post_id = ?1 AND id = ?2 AND user_id = ?3
              AND user_name = ?4 AND text = ?5 AND timestamp = ?6
            "#,
            params![
                record.post_id,
                record.id,
                record.user_id,
                record.user_name,
                record.text,
                record.timestamp
            ],
        )?;
        Ok(removed)
    }
}
