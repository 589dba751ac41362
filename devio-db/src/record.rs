use devio_common::model::{
    Id, ModelValidationError,
    auth::Session,
    comment::Comment,
    post::{Like, Post, PostMarker},
    text::BodyText,
    user::{DisplayName, DisplaySnapshot, User},
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub name: String,
    pub avatar: Option<String>,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub likes: Vec<i64>,
    pub comments: Vec<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub parent_snowflake: Option<i64>,
    pub user_snowflake: i64,
    pub name: String,
    pub avatar: Option<String>,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub children: Vec<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct SessionRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

fn snapshot(name: String, avatar: Option<String>) -> Result<DisplaySnapshot, ModelValidationError> {
    Ok(DisplaySnapshot {
        name: DisplayName::new(name)?,
        avatar,
    })
}

pub(crate) fn likes_from_db(post: Id<PostMarker>, users: Vec<i64>) -> Vec<Like> {
    users
        .into_iter()
        .map(|user| Like {
            post,
            user: Id::from_db(user),
        })
        .collect()
}

fn from_db_ids<M>(ids: Vec<i64>) -> Vec<Id<M>> {
    ids.into_iter().map(Id::from_db).collect()
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.user_snowflake),
            name: DisplayName::new(value.name)?,
            avatar: value.avatar,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        let id = Id::from_db(value.post_snowflake);
        Ok(Self {
            id,
            author: Id::from_db(value.user_snowflake),
            author_snapshot: snapshot(value.name, value.avatar)?,
            text: BodyText::try_from(value.content)?,
            created_at: value.created_at,
            likes: likes_from_db(id, value.likes),
            comments: from_db_ids(value.comments),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.comment_snowflake),
            post: Id::from_db(value.post_snowflake),
            parent: value.parent_snowflake.map(Id::from_db),
            author: Id::from_db(value.user_snowflake),
            author_snapshot: snapshot(value.name, value.avatar)?,
            text: BodyText::try_from(value.content)?,
            created_at: value.created_at,
            children: from_db_ids(value.children),
        })
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_at: value.expires_at,
        })
    }
}
