use log::info;
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// A Telegram user whose shared phone passed directory resolution.
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub telegram_id: i64,
    pub phone_number: String,
    pub display_name: String,
    pub language_code: String,
    pub registered_at: String,
}

/// SQLite-backed registry of users receiving reports.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        info!("User database ready at {}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_in_memory() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        Self::init_schema(&conn).unwrap();
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS registered_users (
                telegram_id INTEGER PRIMARY KEY,
                phone_number TEXT NOT NULL,
                display_name TEXT NOT NULL,
                language_code TEXT NOT NULL,
                registered_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_registered_users_phone
             ON registered_users (phone_number)",
            [],
        )?;
        Ok(())
    }

    /// Inserts or refreshes a registration. Re-sharing a contact updates
    /// the stored phone, name and language in place.
    pub fn upsert(&self, user: &RegisteredUser) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO registered_users
                 (telegram_id, phone_number, display_name, language_code, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(telegram_id) DO UPDATE SET
                 phone_number = excluded.phone_number,
                 display_name = excluded.display_name,
                 language_code = excluded.language_code,
                 registered_at = excluded.registered_at",
            params![
                user.telegram_id,
                user.phone_number,
                user.display_name,
                user.language_code,
                user.registered_at
            ],
        )?;
        Ok(())
    }

    pub fn find(&self, telegram_id: i64) -> rusqlite::Result<Option<RegisteredUser>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT telegram_id, phone_number, display_name, language_code, registered_at
             FROM registered_users WHERE telegram_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![telegram_id], row_to_user)?;
        rows.next().transpose()
    }

    /// Earliest registration holding the given phone, if any.
    pub fn find_by_phone(&self, phone: &str) -> rusqlite::Result<Option<RegisteredUser>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT telegram_id, phone_number, display_name, language_code, registered_at
             FROM registered_users WHERE phone_number = ?1
             ORDER BY registered_at LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![phone], row_to_user)?;
        rows.next().transpose()
    }

    /// All registrations in the order they were made, for the daily run.
    pub fn all(&self) -> rusqlite::Result<Vec<RegisteredUser>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT telegram_id, phone_number, display_name, language_code, registered_at
             FROM registered_users ORDER BY registered_at",
        )?;
        let users = stmt.query_map([], row_to_user)?.collect();
        users
    }

    pub fn count(&self) -> rusqlite::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM registered_users", [], |row| row.get(0))
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegisteredUser> {
    Ok(RegisteredUser {
        telegram_id: row.get(0)?,
        phone_number: row.get(1)?,
        display_name: row.get(2)?,
        language_code: row.get(3)?,
        registered_at: row.get(4)?,
    })
}
