use crate::store::models::LocationRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteLocationRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::LocationRepository for SqliteLocationRepository<'conn> {
    fn upsert(&self, record: &LocationRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO location_sharing
                (user_id, user_name, latitude, longitude, timestamp, is_emergency)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                user_name = excluded.user_name,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                timestamp = excluded.timestamp,
                is_emergency = excluded.is_emergency
            "#,
            params![
                record.user_id,
                record.user_name,
                record.latitude,
                record.longitude,
                record.timestamp,
                record.is_emergency
            ],
        )?;
        Ok(())
    }

    fn get(&self, user_id: &str) -> Result<Option<LocationRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT user_id, user_name, latitude, longitude, timestamp, is_emergency
                FROM location_sharing
                WHERE user_id = ?1
                "#,
                params![user_id],
                |row| {
                    Ok(LocationRecord {
                        user_id: row.get(0)?,
                        user_name: row.get(1)?,
                        latitude: row.get(2)?,
                        longitude: row.get(3)?,
                        timestamp: row.get(4)?,
                        is_emergency: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete(&self, user_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM location_sharing WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    fn list_except(&self, user_id: &str) -> Result<Vec<LocationRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, user_name, latitude, longitude, timestamp, is_emergency
            FROM location_sharing
            WHERE user_id != ?1
            ORDER BY user_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(LocationRecord {
                user_id: row.get(0)?,
                user_name: row.get(1)?,
                latitude: row.get(2)?,
                longitude: row.get(3)?,
                timestamp: row.get(4)?,
                is_emergency: row.get(5)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
