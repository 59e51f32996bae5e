//! Follow entity for SeaORM. One row per directed subscription edge;
//! the (user_id, author_id) pair is unique at the schema level.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "follows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Follower,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Followed,
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to Domain Follow.
impl From<Model> for quill_core::domain::Follow {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            author_id: model.author_id,
            created_at: model.created_at.into(),
        }
    }
}

/// Conversion from Domain Follow to SeaORM ActiveModel.
impl From<quill_core::domain::Follow> for ActiveModel {
    fn from(follow: quill_core::domain::Follow) -> Self {
        Self {
            id: Set(follow.id),
            user_id: Set(follow.user_id),
            author_id: Set(follow.author_id),
            created_at: Set(follow.created_at.into()),
        }
    }
}
