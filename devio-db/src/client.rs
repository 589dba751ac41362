use crate::record::{CommentRecord, PostRecord, SessionRecord, UserRecord, likes_from_db};
use devio_common::{
    model::{
        DevioSnowflakeGenerator, Id, ModelValidationError,
        auth::{Session, SessionTokenHash},
        comment::{Comment, CommentMarker, NewComment},
        post::{Like, NewPost, Post, PostMarker},
        user::{User, UserMarker},
    },
    snowflake::{ProcessId, SnowflakeError, WorkerId},
};
use devio_core::StoreError;
use sqlx::{
    PgPool, migrate::MigrateError, postgres::PgPoolOptions, query, query_as, query_scalar,
};
use thiserror::Error;
use tracing::debug;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not allocate an id: {0}")]
    Snowflake(#[from] SnowflakeError),
    #[error("Migrating the database failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        StoreError::new(value)
    }
}

const POST_COLUMNS: &str = "
    posts.post_snowflake,
    posts.user_snowflake,
    posts.name,
    posts.avatar,
    posts.content,
    posts.created_at,
    posts.likes,
    posts.comments
";

/// Postgres arrays are 1-based; slicing up to `position` keeps the first `position`
/// elements.
fn array_position(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: DevioSnowflakeGenerator,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            snowflake_generator: DevioSnowflakeGenerator::new(worker_id, process_id),
        }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.name,
                users.avatar
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    pub async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>> {
        let record = query_as::<_, SessionRecord>(
            "
            SELECT
                sessions.user_snowflake,
                sessions.token_hash,
                sessions.created_at,
                sessions.expires_at
            FROM
                auth.sessions
            WHERE
                sessions.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Session::try_from).transpose()?)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts.posts WHERE posts.post_snowflake = $1"
        ))
        .bind(post_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    pub async fn fetch_posts(&self, author: Option<Id<UserMarker>>) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts.posts
            WHERE $1::BIGINT IS NULL OR posts.user_snowflake = $1
            ORDER BY posts.created_at DESC, posts.post_snowflake DESC
            "
        ))
        .bind(author.map(Id::to_db))
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?)
    }

    pub async fn insert_post(&self, post: &NewPost) -> Result<Id<PostMarker>> {
        let post_id: Id<PostMarker> = Id::new(self.snowflake_generator.generate()?);

        query(
            "
            INSERT INTO posts.posts (post_snowflake, user_snowflake, name, avatar, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(post_id.to_db())
        .bind(post.author.to_db())
        .bind(post.author_snapshot.name.get())
        .bind(post.author_snapshot.avatar.as_deref())
        .bind(post.text.get())
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;

        debug!(post = %post_id, "Inserted post");
        Ok(post_id)
    }

    /// Places a root comment at `position` in one statement. Returns whether the
    /// post exists.
    pub async fn link_root(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
        position: usize,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE posts.posts
            SET comments = comments[1:$3] || $2::BIGINT || comments[$3 + 1:]
            WHERE posts.post_snowflake = $1
            ",
        )
        .bind(post_id.to_db())
        .bind(comment_id.to_db())
        .bind(array_position(position))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unlink_root(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE posts.posts
            SET comments = array_remove(comments, $2)
            WHERE posts.post_snowflake = $1 AND $2 = ANY(posts.comments)
            ",
        )
        .bind(post_id.to_db())
        .bind(comment_id.to_db())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Prepends a like unless the user already likes the post. Returns the new
    /// likes, or `None` if nothing changed.
    pub async fn insert_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Vec<Like>>> {
        let likes = query_scalar::<_, Vec<i64>>(
            "
            UPDATE posts.posts
            SET likes = array_prepend($2, likes)
            WHERE posts.post_snowflake = $1 AND NOT ($2 = ANY(posts.likes))
            RETURNING posts.likes
            ",
        )
        .bind(post_id.to_db())
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(likes.map(|likes| likes_from_db(post_id, likes)))
    }

    pub async fn delete_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Vec<Like>>> {
        let likes = query_scalar::<_, Vec<i64>>(
            "
            UPDATE posts.posts
            SET likes = array_remove(likes, $2)
            WHERE posts.post_snowflake = $1 AND $2 = ANY(posts.likes)
            RETURNING posts.likes
            ",
        )
        .bind(post_id.to_db())
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(likes.map(|likes| likes_from_db(post_id, likes)))
    }

    /// Removes the post and every comment recorded against it in one transaction.
    pub async fn remove_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM posts.comments WHERE comments.post_snowflake = $1")
            .bind(post_id.to_db())
            .execute(&mut *tx)
            .await?;
        let result = query("DELETE FROM posts.posts WHERE posts.post_snowflake = $1")
            .bind(post_id.to_db())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.parent_snowflake,
                comments.user_snowflake,
                comments.name,
                comments.avatar,
                comments.content,
                comments.created_at,
                comments.children
            FROM
                posts.comments
            WHERE
                comments.comment_snowflake = $1
            ",
        )
        .bind(comment_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::try_from).transpose()?)
    }

    pub async fn insert_comment(&self, comment: &NewComment) -> Result<Id<CommentMarker>> {
        let comment_id: Id<CommentMarker> = Id::new(self.snowflake_generator.generate()?);

        query(
            "
            INSERT INTO posts.comments
                (comment_snowflake, post_snowflake, parent_snowflake, user_snowflake,
                 name, avatar, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(comment_id.to_db())
        .bind(comment.post.to_db())
        .bind(comment.parent.map(Id::to_db))
        .bind(comment.author.to_db())
        .bind(comment.author_snapshot.name.get())
        .bind(comment.author_snapshot.avatar.as_deref())
        .bind(comment.text.get())
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        debug!(comment = %comment_id, post = %comment.post, "Inserted comment");
        Ok(comment_id)
    }

    /// Places a reply at `position` in one statement. Returns whether the parent
    /// exists.
    pub async fn link_reply(
        &self,
        parent_id: Id<CommentMarker>,
        child_id: Id<CommentMarker>,
        position: usize,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE posts.comments
            SET children = children[1:$3] || $2::BIGINT || children[$3 + 1:]
            WHERE comments.comment_snowflake = $1
            ",
        )
        .bind(parent_id.to_db())
        .bind(child_id.to_db())
        .bind(array_position(position))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unlink_reply(
        &self,
        parent_id: Id<CommentMarker>,
        child_id: Id<CommentMarker>,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE posts.comments
            SET children = array_remove(children, $2)
            WHERE comments.comment_snowflake = $1 AND $2 = ANY(comments.children)
            ",
        )
        .bind(parent_id.to_db())
        .bind(child_id.to_db())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_comment_subtree(&self, comment_id: Id<CommentMarker>) -> Result<usize> {
        let result = query(
            "
            WITH RECURSIVE subtree (comment_snowflake) AS (
                SELECT comments.comment_snowflake
                FROM posts.comments
                WHERE comments.comment_snowflake = $1
            UNION
                SELECT child.comment_snowflake
                FROM posts.comments AS child
                JOIN subtree ON child.parent_snowflake = subtree.comment_snowflake
            )
            DELETE FROM posts.comments
            WHERE comments.comment_snowflake IN (SELECT comment_snowflake FROM subtree)
            ",
        )
        .bind(comment_id.to_db())
        .execute(&self.pool)
        .await?;

        let removed = usize::try_from(result.rows_affected()).unwrap_or(usize::MAX);
        debug!(comment = %comment_id, removed, "Removed comment subtree");
        Ok(removed)
    }
}
