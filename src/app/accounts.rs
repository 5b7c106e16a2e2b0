//! Users, permissions and password digests.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{Connection, Criteria, DbResult, Fields, Model, Record};
use crate::session::Permission;

pub const USERS_TABLE: &str = "users";
pub const PERMISSIONS_TABLE: &str = "permissions";

/// Module name guarding the user pages.
pub const USERS_MODULE: &str = "USERS";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    must_change_password INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS permissions (
    user_uuid TEXT NOT NULL REFERENCES users(uuid),
    module TEXT NOT NULL,
    access INTEGER NOT NULL DEFAULT 1
);
";

/// Columns safe to expose and keep in the session.
pub const PUBLIC_COLUMNS: &str = "uuid, name, email, role, must_change_password";

/// Create the tables if they are missing.
pub fn install(conn: &Connection) -> DbResult<()> {
    conn.execute_script(SCHEMA)?;
    tracing::debug!("Schema installed");
    Ok(())
}

/// Hex SHA-256 of `salt` followed by `password`.
pub fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fields for a password change: fresh salt, new digest.
pub fn password_fields(password: &str) -> Fields {
    let salt = Uuid::new_v4().simple().to_string();
    let hash = digest(&salt, password);
    Fields::new().with("password_hash", hash).with("salt", salt)
}

/// A new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: &'a str,
    pub must_change_password: bool,
    pub modules: &'a [&'a str],
}

/// Insert `user` and its module grants. Returns the new uuid.
pub fn create_user(model: &Model<'_>, user: &NewUser<'_>) -> DbResult<String> {
    let uuid = model.generate_unique_id(USERS_TABLE)?;

    let fields = password_fields(user.password)
        .with("uuid", uuid.as_str())
        .with("name", user.name)
        .with("email", user.email.trim().to_ascii_lowercase())
        .with("role", user.role)
        .with("must_change_password", user.must_change_password);
    model.insert(USERS_TABLE, &fields)?;

    for module in user.modules {
        let grant = Fields::new()
            .with("user_uuid", uuid.as_str())
            .with("module", *module)
            .with("access", true);
        model.insert(PERMISSIONS_TABLE, &grant)?;
    }

    tracing::info!(uuid = %uuid, role = user.role, "User created");
    Ok(uuid)
}

/// Seed an administrator when the users table is empty.
///
/// The seeded account must change its password on first sign-in.
pub fn seed_admin(model: &Model<'_>, email: &str, password: &str) -> DbResult<Option<String>> {
    if !model.find_one(USERS_TABLE, "uuid", &Criteria::all())?.is_empty() {
        return Ok(None);
    }
    let uuid = create_user(
        model,
        &NewUser {
            name: "Administrator",
            email,
            password,
            role: "admin",
            must_change_password: true,
            modules: &[USERS_MODULE],
        },
    )?;
    tracing::warn!(email, "Seeded administrator account; change its password on first sign-in");
    Ok(Some(uuid))
}

/// The user with `email` whose password matches, or `None`.
pub fn authenticate(model: &Model<'_>, email: &str, password: &str) -> DbResult<Option<Record>> {
    let criteria = Criteria::new("email = :email").bind("email", email.trim().to_ascii_lowercase());
    let row = model.find_one(USERS_TABLE, "*", &criteria)?;
    if row.is_empty() {
        return Ok(None);
    }

    let salt = row.get("salt").and_then(|v| v.as_str()).unwrap_or_default();
    let stored = row.get("password_hash").and_then(|v| v.as_str()).unwrap_or_default();
    if digest(salt, password) != stored {
        return Ok(None);
    }
    Ok(Some(public_record(row)))
}

/// `row` without credential columns.
pub fn public_record(mut row: Record) -> Record {
    row.remove("password_hash");
    row.remove("salt");
    row.remove("id");
    row
}

pub fn permissions_for(model: &Model<'_>, user_uuid: &str) -> DbResult<Vec<Permission>> {
    let criteria = Criteria::new("user_uuid = :uuid").bind("uuid", user_uuid);
    let rows = model.find_all(PERMISSIONS_TABLE, "module, access", &criteria)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let module = row.get("module")?.as_str()?.to_string();
            let access = row.get("access").is_some_and(|v| v.as_bool());
            Some(Permission::new(module, access))
        })
        .collect())
}

pub fn find_by_uuid(model: &Model<'_>, uuid: &str) -> DbResult<Record> {
    model.find_one(USERS_TABLE, PUBLIC_COLUMNS, &Criteria::new("uuid = :uuid").bind("uuid", uuid))
}

pub fn email_taken(model: &Model<'_>, email: &str) -> DbResult<bool> {
    let criteria = Criteria::new("email = :email").bind("email", email.trim().to_ascii_lowercase());
    Ok(!model.find_one(USERS_TABLE, "uuid", &criteria)?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        install(&conn).unwrap();
        conn
    }

    #[test]
    fn test_digest_is_salted() {
        assert_eq!(digest("a", "pw"), digest("a", "pw"));
        assert_ne!(digest("a", "pw"), digest("b", "pw"));
        assert_eq!(digest("a", "pw").len(), 64);
    }

    #[test]
    fn test_create_and_authenticate() {
        let conn = setup();
        let model = Model::new(&conn);
        let uuid = create_user(
            &model,
            &NewUser {
                name: "Ana",
                email: "Ana@Example.com",
                password: "s3cret!",
                role: "user",
                must_change_password: false,
                modules: &["USERS", "BILLING"],
            },
        )
        .unwrap();

        let user = authenticate(&model, "ana@example.com", "s3cret!").unwrap().unwrap();
        assert_eq!(user.get("uuid").and_then(|v| v.as_str()), Some(uuid.as_str()));
        assert!(!user.contains_key("password_hash"));
        assert!(!user.contains_key("salt"));

        assert!(authenticate(&model, "ana@example.com", "wrong").unwrap().is_none());
        assert!(authenticate(&model, "nobody@example.com", "s3cret!").unwrap().is_none());

        let perms = permissions_for(&model, &uuid).unwrap();
        assert_eq!(perms.len(), 2);
        assert!(perms.iter().all(|p| p.access));
        assert!(email_taken(&model, "ANA@example.com").unwrap());
    }

    #[test]
    fn test_seed_admin_only_once() {
        let conn = setup();
        let model = Model::new(&conn);
        assert!(seed_admin(&model, "admin@example.com", "admin").unwrap().is_some());
        assert!(seed_admin(&model, "admin@example.com", "admin").unwrap().is_none());

        let admin = authenticate(&model, "admin@example.com", "admin").unwrap().unwrap();
        assert_eq!(admin.get("role").and_then(|v| v.as_str()), Some("admin"));
        assert!(admin.get("must_change_password").is_some_and(|v| v.as_bool()));
    }
}
