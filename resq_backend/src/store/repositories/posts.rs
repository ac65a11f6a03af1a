use crate::store::models::PostRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO posts (id, user_id, author_name, content, category, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.user_id,
                record.author_name,
                record.content,
                record.category,
                record.timestamp
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, author_name, content, category, timestamp
                FROM posts
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(PostRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        author_name: row.get(2)?,
                        content: row.get(3)?,
                        category: row.get(4)?,
                        timestamp: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    fn list_feed(&self) -> Result<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, author_name, content, category, timestamp
            FROM posts
            ORDER BY timestamp DESC, id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PostRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                author_name: row.get(2)?,
                content: row.get(3)?,
                category: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn update_content(&self, id: &str, content: &str, category: &str) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE posts
            SET content = ?2, category = ?3
            WHERE id = ?1
            "#,
            params![id, content, category],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(())
    }
}
