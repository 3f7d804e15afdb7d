use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::error::ApiError;
use crate::users::{CustomerAddress, ShippingAddressRequest, User};

const USER_COLUMNS: &str = "id, email, full_name, loyalty_points, status, created_at";
const ADDRESS_COLUMNS: &str =
    "id, user_id, full_name, address_line1, address_line2, city, state, zip_code, country, is_default";

/// Repository for user lookups and loyalty balance updates
pub struct UsersRepository;

impl UsersRepository {
    /// Find a user that has not been deleted
    pub async fn find_active<'e, E>(executor: E, user_id: Uuid) -> Result<Option<User>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND status = 'active'",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Resolve an active user or fail with NotFound
    pub async fn require_active<'e, E>(executor: E, user_id: Uuid) -> Result<User, ApiError>
    where
        E: PgExecutor<'e>,
    {
        Self::find_active(executor, user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User", user_id))
    }

    /// Lock an active user's row for a balance update
    pub async fn lock_active(conn: &mut PgConnection, user_id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND status = 'active' FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::not_found("User", user_id))
    }

    /// Email shown on order projections, regardless of account status
    pub async fn email_of<'e, E>(executor: E, user_id: Uuid) -> Result<Option<String>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

        Ok(email)
    }

    /// Add claimed points to the spendable balance, returning the new total
    pub async fn add_loyalty_points(
        conn: &mut PgConnection,
        user_id: Uuid,
        points: i64,
    ) -> Result<i64, ApiError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET loyalty_points = loyalty_points + $1
            WHERE id = $2 AND status = 'active'
            RETURNING loyalty_points
            "#,
        )
        .bind(points)
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::not_found("User", user_id))?;

        Ok(total)
    }
}

/// Repository for customer shipping addresses
pub struct AddressRepository;

impl AddressRepository {
    pub async fn find_by_id<'e, E>(
        executor: E,
        address_id: Uuid,
    ) -> Result<Option<CustomerAddress>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let address = sqlx::query_as::<_, CustomerAddress>(&format!(
            "SELECT {} FROM customer_addresses WHERE id = $1",
            ADDRESS_COLUMNS
        ))
        .bind(address_id)
        .fetch_optional(executor)
        .await?;

        Ok(address)
    }

    /// Store an address supplied inline at checkout (never marked default)
    pub async fn create_inline(
        conn: &mut PgConnection,
        user_id: Uuid,
        request: &ShippingAddressRequest,
    ) -> Result<CustomerAddress, ApiError> {
        let address = sqlx::query_as::<_, CustomerAddress>(&format!(
            r#"
            INSERT INTO customer_addresses
                (user_id, full_name, address_line1, address_line2, city, state, zip_code, country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(user_id)
        .bind(&request.full_name)
        .bind(&request.address_line1)
        .bind(&request.address_line2)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.zip_code)
        .bind(&request.country)
        .fetch_one(conn)
        .await?;

        Ok(address)
    }
}
