use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteLikeRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::LikeRepository for SqliteLikeRepository<'conn> {
    fn toggle(&self, post_id: &str, user_id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let already_liked: i64 = tx.query_row(
                r#"
                SELECT COUNT(*)
                FROM post_likes
                WHERE post_id = ?1 AND user_id = ?2
                "#,
                params![post_id, user_id],
                |row| row.get(0),
            )?;
            if already_liked > 0 {
                tx.execute(
                    "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                    params![post_id, user_id],
                )?;
            } else {
                tx.execute(
                    "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                    params![post_id, user_id],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_for_post(&self, post_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id
            FROM post_likes
            WHERE post_id = ?1
            ORDER BY user_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id], |row| row.get::<_, String>(0))?;
        let mut likers = Vec::new();
        for row in rows {
            likers.push(row?);
        }
        Ok(likers)
    }
}
