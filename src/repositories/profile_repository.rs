use super::contains_pattern;
use crate::error::RepositoryError;
use crate::models::{NewProfile, Profile, ProfileChanges, Role};
use sqlx::PgPool;
use uuid::Uuid;

const PROFILE_COLUMNS: &str =
    "id, full_name, email, phone, location, role, wallet_balance, is_active, updated_at";

/// Repository for profile data access
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Create a new ProfileRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new profile with the given role
    pub async fn create(&self, profile: &NewProfile, role: Role) -> Result<Profile, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO profiles (id, full_name, email, phone, location, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Profile>(&sql)
            .bind(profile.id)
            .bind(&profile.full_name)
            .bind(&profile.email)
            .bind(&profile.phone)
            .bind(&profile.location)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// Find a profile by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// Find several profiles at once, ordered by name
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Profile>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1) ORDER BY full_name ASC"
        );
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    /// Members (role = member) whose name or email contains `search`
    pub async fn search_members(&self, search: Option<&str>) -> Result<Vec<Profile>, RepositoryError> {
        let pattern = contains_pattern(search);
        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE role = 'member'
              AND ($1::text IS NULL OR full_name ILIKE $1 ESCAPE '\' OR email ILIKE $1 ESCAPE '\')
            ORDER BY full_name ASC
            "#
        );
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    /// Every profile, admins included
    pub async fn list_all(&self) -> Result<Vec<Profile>, RepositoryError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY full_name ASC");
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    /// IDs of every profile with the given role
    pub async fn ids_by_role(&self, role: Role) -> Result<Vec<Uuid>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM profiles WHERE role = $1 ORDER BY updated_at ASC, id ASC",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// The longest-standing admin, used as the default recipient of member requests
    pub async fn find_first_admin(&self) -> Result<Option<Profile>, RepositoryError> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE role = 'admin' ORDER BY updated_at ASC, id ASC LIMIT 1"
        );
        let admin = sqlx::query_as::<_, Profile>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin)
    }

    /// Apply the supplied field changes; untouched fields keep their value
    pub async fn update(&self, id: Uuid, changes: &ProfileChanges) -> Result<Profile, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                location = COALESCE($5, location),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(&changes.full_name)
            .bind(&changes.email)
            .bind(&changes.phone)
            .bind(&changes.location)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Profile {} not found", id)))?;
        Ok(updated)
    }

    /// Activate or deactivate an account
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Profile, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Profile {} not found", id)))?;
        Ok(updated)
    }

    /// Count profiles with the given role
    pub async fn count_by_role(&self, role: Role) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
