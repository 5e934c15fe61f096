use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::domain::{DomainError, DomainResult, ResetToken, ResetTokenRepository};
use crate::infrastructure::database::entities::password_reset_token;
use crate::infrastructure::database::repositories::db_err;

pub struct SeaOrmResetTokenRepository {
    db: DatabaseConnection,
}

impl SeaOrmResetTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(model: password_reset_token::Model) -> ResetToken {
    ResetToken {
        id: model.id,
        token: model.token,
        user_id: model.user_id,
        expires_at: model.expires_at,
        used: model.used,
        created_at: model.created_at,
    }
}

#[async_trait]
impl ResetTokenRepository for SeaOrmResetTokenRepository {
    async fn insert(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<ResetToken> {
        let model = password_reset_token::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            token: Set(token.to_string()),
            user_id: Set(user_id.to_string()),
            expires_at: Set(expires_at),
            used: Set(false),
            created_at: Set(Utc::now()),
        };

        let inserted = model.insert(&self.db).await.map_err(db_err)?;

        Ok(model_to_domain(inserted))
    }

    async fn find_by_token(&self, token: &str) -> DomainResult<Option<ResetToken>> {
        let model = password_reset_token::Entity::find()
            .filter(password_reset_token::Column::Token.eq(token))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(model_to_domain))
    }

    async fn mark_used(&self, id: &str) -> DomainResult<()> {
        let existing = password_reset_token::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound {
                entity: "ResetToken",
                field: "id",
                value: id.to_string(),
            })?;

        let mut active: password_reset_token::ActiveModel = existing.into();
        active.used = Set(true);
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DomainResult<u64> {
        let result = password_reset_token::Entity::delete_many()
            .filter(password_reset_token::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        // Spent tokens are swept together with expired ones
        let result = password_reset_token::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(password_reset_token::Column::ExpiresAt.lte(now))
                    .add(password_reset_token::Column::Used.eq(true)),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
