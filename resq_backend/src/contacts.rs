use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS emergency_contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    icon TEXT NOT NULL,
    category TEXT NOT NULL
);
"#;

/// Nationwide hotlines bundled with the build so the directory is
/// usable before any network call has succeeded.
const SEED_CONTACTS: [(&str, &str, &str, &str); 5] = [
    ("National Emergency Hotline", "911", "emergency", "National"),
    (
        "Philippine Coast Guard",
        "(02) 8527-3877",
        "coast_guard",
        "Maritime",
    ),
    (
        "Bureau of Fire Protection",
        "(02) 8426-0219, (02) 8426-0246",
        "fire",
        "Fire",
    ),
    (
        "Philippine Red Cross",
        "143 or (02) 8527-8385 to 95",
        "red_cross",
        "Medical",
    ),
    (
        "Department of Public Works and Highways",
        "165-02",
        "public_works",
        "Infrastructure",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub id: i64,
    pub name: String,
    pub phone_number: String,
    /// Icon key, not a rendered glyph; [`icon_symbol`](Self::icon_symbol)
    /// maps it for console output.
    pub icon: String,
    pub category: String,
}

impl EmergencyContact {
    pub fn icon_symbol(&self) -> &'static str {
        match self.icon.as_str() {
            "emergency" => "🚨",
            "coast_guard" => "⚓",
            "fire" => "🔥",
            "red_cross" => "🏥",
            "public_works" => "🏗️",
            _ => "📞",
        }
    }
}

/// Hotline directory on its own database file, kept apart from the
/// community store so wiping one never touches the other.
#[derive(Clone)]
pub struct ContactsCache {
    conn: Arc<Mutex<Connection>>,
}

impl ContactsCache {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self::from_connection(conn);
        cache.ensure_seeded()?;
        Ok(cache)
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Creates the table and inserts the bundled hotlines, but only into
    /// an empty directory. Reopening an existing file changes nothing.
    pub fn ensure_seeded(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(MIGRATIONS)?;
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM emergency_contacts", [], |row| {
                    row.get(0)
                })?;
            if count == 0 {
                for (name, phone_number, icon, category) in SEED_CONTACTS {
                    conn.execute(
                        r#"
                        INSERT INTO emergency_contacts (name, phone_number, icon, category)
                        VALUES (?1, ?2, ?3, ?4)
                        "#,
                        params![name, phone_number, icon, category],
                    )?;
                }
            }
            Ok(())
        })
    }

    pub fn list_all(&self) -> Result<Vec<EmergencyContact>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, name, phone_number, icon, category
                FROM emergency_contacts
                ORDER BY id ASC
                "#,
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(EmergencyContact {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone_number: row.get(2)?,
                    icon: row.get(3)?,
                    category: row.get(4)?,
                })
            })?;
            let mut contacts = Vec::new();
            for row in rows {
                contacts.push(row?);
            }
            Ok(contacts)
        })
    }

    /// Directory listing narrowed by exact category and a free-text needle
    /// matched against both name and phone number.
    pub fn list_filtered(
        &self,
        category: Option<&str>,
        query: Option<&str>,
    ) -> Result<Vec<EmergencyContact>> {
        let needle = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let contacts = self
            .list_all()?
            .into_iter()
            .filter(|contact| category.map_or(true, |wanted| contact.category == wanted))
            .filter(|contact| {
                needle.as_deref().map_or(true, |needle| {
                    contact.name.to_lowercase().contains(needle)
                        || contact.phone_number.to_lowercase().contains(needle)
                })
            })
            .collect();
        Ok(contacts)
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("contacts mutex poisoned"))?;
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_cache() -> ContactsCache {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let cache = ContactsCache::from_connection(conn);
        cache.ensure_seeded().expect("seed");
        cache
    }

    #[test]
    fn seeding_is_idempotent() {
        let cache = setup_cache();
        cache.ensure_seeded().expect("second seed");
        let contacts = cache.list_all().expect("list");
        assert_eq!(contacts.len(), 5);
        assert_eq!(contacts[0].name, "National Emergency Hotline");
        assert_eq!(contacts[0].phone_number, "911");
        assert_eq!(contacts[0].icon, "emergency");
        assert_eq!(contacts[0].category, "National");
    }

    #[test]
    fn filters_by_category_and_query() {
        let cache = setup_cache();

        let fire = cache.list_filtered(Some("Fire"), None).expect("fire");
        assert_eq!(fire.len(), 1);
        assert_eq!(fire[0].name, "Bureau of Fire Protection");

        let coast = cache.list_filtered(None, Some("coast")).expect("coast");
        assert_eq!(coast.len(), 1);
        assert_eq!(coast[0].name, "Philippine Coast Guard");

        let by_number = cache.list_filtered(None, Some("911")).expect("911");
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].icon, "emergency");

        let blank = cache.list_filtered(None, Some("   ")).expect("blank");
        assert_eq!(blank.len(), 5);

        let nothing = cache
            .list_filtered(Some("Fire"), Some("coast"))
            .expect("mismatch");
        assert!(nothing.is_empty());
    }

    #[test]
    fn icons_follow_the_stored_keys() {
        let cache = setup_cache();
        let contacts = cache.list_all().expect("list");
        let symbols: Vec<&str> = contacts.iter().map(|c| c.icon_symbol()).collect();
        assert_eq!(symbols, vec!["🚨", "⚓", "🔥", "🏥", "🏗️"]);
    }
}
