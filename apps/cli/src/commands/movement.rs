//! # Movement Commands
//!
//! The stock ledger. Movements are appended, never edited.

use tracing::info;

use crate::error::ApiError;
use crate::state::{DbState, SessionState};
use stock_core::validation::validate_movement;
use stock_core::{Capability, Movement, MovementInput};

/// Full history, newest first.
pub async fn list_movements(db: &DbState, session: &SessionState) -> Result<Vec<Movement>, ApiError> {
    session.require(Capability::Movements).await?;
    Ok(db.inner().movements().list().await?)
}

/// Appends an ENTREE or SORTIE movement.
///
/// ## Errors
/// - `VALIDATION_ERROR` when the product is missing or unknown, or the
///   quantity is not positive
pub async fn record_movement(
    db: &DbState,
    session: &SessionState,
    input: MovementInput,
) -> Result<Movement, ApiError> {
    let identity = session.require(Capability::Movements).await?;
    let movement = validate_movement(&input)?;

    if !db.inner().products().exists(movement.product_id).await? {
        return Err(ApiError::validation(format!(
            "product {} does not exist",
            movement.product_id
        )));
    }

    let stored = db.inner().movements().insert(&movement, identity.user.id).await?;
    db.commit().await?;

    info!(
        movement_id = stored.id,
        product_id = stored.product_id,
        kind = %stored.kind,
        quantity = stored.quantity,
        "Movement recorded"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::NaiveDate;
    use stock_core::{Identity, MovementKind, Permissions, ProductInput, Role};
    use stock_db::{Database, DbConfig};

    async fn setup(permissions: Permissions) -> (DbState, SessionState, i64) {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let user = db
            .inner()
            .users()
            .create("clerk@shop.local", "h", Role::User, permissions)
            .await
            .unwrap();
        let product = db
            .inner()
            .products()
            .insert(
                &ProductInput {
                    code: "RIZ".into(),
                    name: "Rice".into(),
                    initial_stock: 10,
                    ..Default::default()
                },
                user.id,
            )
            .await
            .unwrap();
        let session = SessionState::volatile();
        session.establish(Identity { user, permissions }).await.unwrap();
        (db, session, product.id)
    }

    fn input(product_id: Option<i64>, kind: MovementKind, quantity: i64) -> MovementInput {
        MovementInput {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            kind,
            product_id,
            quantity,
            unit_price_cents: None,
            client_name: None,
            client_phone: None,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let (db, session, product_id) = setup(Permissions::all_granted()).await;

        let m = record_movement(&db, &session, input(Some(product_id), MovementKind::Entree, 4))
            .await
            .unwrap();
        assert_eq!(m.creator_email.as_deref(), Some("clerk@shop.local"));
        assert_eq!(list_movements(&db, &session).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (db, session, product_id) = setup(Permissions::all_granted()).await;

        for bad in [
            input(None, MovementKind::Entree, 1),
            input(Some(product_id + 1), MovementKind::Entree, 1),
            input(Some(product_id), MovementKind::Sortie, 0),
            input(Some(product_id), MovementKind::Sortie, -3),
        ] {
            let err = record_movement(&db, &session, bad).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationError);
        }
        assert!(db.inner().movements().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gated() {
        let perms = Permissions::all_granted().with(Capability::Movements, false);
        let (db, session, product_id) = setup(perms).await;

        let err = record_movement(&db, &session, input(Some(product_id), MovementKind::Entree, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(list_movements(&db, &session).await.unwrap_err().code, ErrorCode::Forbidden);
    }
}
