//! Post, group, profile and follow pages.

use std::collections::HashMap;
use std::time::Duration;

use actix_web::{HttpResponse, web};
use askama::Template;
use serde::Deserialize;
use uuid::Uuid;

use quill_core::domain::{Comment, Follow, Group, Post};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, Cache, CommentRepository, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};
use quill_shared::{CommentForm, PostForm};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult, html, redirect};
use crate::state::AppState;
use crate::templates::{
    CommentRow, FollowTemplate, GroupChoice, GroupListTemplate, GroupRef, IndexTemplate, Nav,
    Pager, PostCard, PostDetailTemplate, PostFormTemplate, ProfileTemplate, format_timestamp,
};

/// How long a rendered home-feed page is served from cache.
const INDEX_CACHE_TTL: Duration = Duration::from_secs(20);

/// Pagination query string. Unparsable values fall back to page one,
/// matching the clamping the listings promise.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

fn requested_page(query: &PageQuery) -> u64 {
    query
        .page
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
}

/// Attach author usernames and group references to a page of posts.
async fn post_cards(state: &AppState, posts: &[Post]) -> AppResult<Vec<PostCard>> {
    let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let usernames: HashMap<Uuid, String> = state
        .users
        .find_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let mut group_ids: Vec<Uuid> = posts.iter().filter_map(|p| p.group_id).collect();
    group_ids.sort_unstable();
    group_ids.dedup();
    let group_refs: HashMap<Uuid, GroupRef> = state
        .groups
        .find_by_ids(&group_ids)
        .await?
        .into_iter()
        .map(|g| {
            (
                g.id,
                GroupRef {
                    title: g.title,
                    slug: g.slug,
                },
            )
        })
        .collect();

    Ok(posts
        .iter()
        .map(|p| PostCard {
            id: p.id,
            text: p.text.clone(),
            author_username: usernames
                .get(&p.author_id)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            group: p.group_id.and_then(|id| group_refs.get(&id).cloned()),
            image_url: p.image_url.clone(),
            published_at: format_timestamp(&p.published_at),
        })
        .collect())
}

/// GET / - the home feed.
///
/// The rendered page is cached whole for a short TTL; within that
/// window every viewer gets the stored body untouched by later writes.
pub async fn index(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let number = requested_page(&query);
    let cache_key = format!("page:index:{number}");

    if let Some(cached) = state.cache.get(&cache_key).await {
        tracing::debug!(key = %cache_key, "Serving home feed from cache");
        return Ok(html(cached));
    }

    let page = state.posts.list_recent(number).await?;
    let body = IndexTemplate {
        nav: Nav::for_viewer(&viewer.0),
        posts: post_cards(&state, &page.items).await?,
        pager: Pager::from_page(&page),
    }
    .render()?;

    if let Err(e) = state
        .cache
        .set(&cache_key, &body, Some(INDEX_CACHE_TTL))
        .await
    {
        tracing::warn!("Failed to cache home feed page: {}", e);
    }

    Ok(html(body))
}

/// GET /follow/ - posts from authors the viewer follows.
pub async fn follow_index(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let authors = state.follows.authors_for(identity.user_id).await?;
    let page = state
        .posts
        .list_by_authors(&authors, requested_page(&query))
        .await?;

    let body = FollowTemplate {
        nav: Nav::for_user(&identity),
        posts: post_cards(&state, &page.items).await?,
        pager: Pager::from_page(&page),
    }
    .render()?;

    Ok(html(body))
}

/// GET /group/{slug}/ - a group's posts.
pub async fn group_posts(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group '{slug}'")))?;

    let page = state
        .posts
        .list_by_group(group.id, requested_page(&query))
        .await?;

    let body = GroupListTemplate {
        nav: Nav::for_viewer(&viewer.0),
        group_title: group.title,
        group_description: group.description,
        posts: post_cards(&state, &page.items).await?,
        pager: Pager::from_page(&page),
    }
    .render()?;

    Ok(html(body))
}

/// GET /profile/{username}/ - an author's posts and follow state.
pub async fn profile(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{username}'")))?;

    let page = state
        .posts
        .list_by_author(author.id, requested_page(&query))
        .await?;
    let post_count = state.posts.count_by_author(author.id).await?;

    let (following, is_self) = match &viewer.0 {
        Some(identity) => (
            state.follows.exists(identity.user_id, author.id).await?,
            identity.user_id == author.id,
        ),
        None => (false, false),
    };

    let body = ProfileTemplate {
        nav: Nav::for_viewer(&viewer.0),
        author_username: author.username,
        post_count,
        following,
        is_self,
        posts: post_cards(&state, &page.items).await?,
        pager: Pager::from_page(&page),
    }
    .render()?;

    Ok(html(body))
}

/// GET /posts/{id}/ - full text, comments, and the comment form.
pub async fn post_detail(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))?;

    let author_post_count = state.posts.count_by_author(post.author_id).await?;
    let can_edit = viewer
        .0
        .as_ref()
        .is_some_and(|identity| identity.user_id == post.author_id);

    let comments = state.comments.list_for_post(post.id).await?;
    let comment_rows = comment_rows(&state, &comments).await?;

    let card = post_cards(&state, std::slice::from_ref(&post))
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("post card missing".to_string()))?;

    let body = PostDetailTemplate {
        nav: Nav::for_viewer(&viewer.0),
        post: card,
        author_post_count,
        comments: comment_rows,
        can_comment: viewer.0.is_some(),
        can_edit,
    }
    .render()?;

    Ok(html(body))
}

async fn comment_rows(state: &AppState, comments: &[Comment]) -> AppResult<Vec<CommentRow>> {
    let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let usernames: HashMap<Uuid, String> = state
        .users
        .find_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    Ok(comments
        .iter()
        .map(|c| CommentRow {
            author_username: usernames
                .get(&c.author_id)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            text: c.text.clone(),
            created_at: format_timestamp(&c.created_at),
        })
        .collect())
}

fn group_choices(groups: Vec<Group>, selected: Option<Uuid>) -> Vec<GroupChoice> {
    groups
        .into_iter()
        .map(|g| GroupChoice {
            selected: selected == Some(g.id),
            id: g.id,
            title: g.title,
        })
        .collect()
}

async fn render_post_form(
    state: &AppState,
    identity: &Identity,
    action: String,
    heading: &str,
    button_label: &str,
    text: String,
    group: Option<Uuid>,
    image_url: Option<String>,
    error: Option<String>,
) -> AppResult<HttpResponse> {
    let groups = state.groups.list_all().await?;

    let body = PostFormTemplate {
        nav: Nav::for_user(identity),
        heading: heading.to_string(),
        button_label: button_label.to_string(),
        action,
        text,
        image_url: image_url.unwrap_or_default(),
        groups: group_choices(groups, group),
        error,
    }
    .render()?;

    Ok(html(body))
}

/// GET /create/ - the new-post form.
pub async fn post_create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    render_post_form(
        &state,
        &identity,
        "/create/".to_string(),
        "New post",
        "Create",
        String::new(),
        None,
        None,
        None,
    )
    .await
}

/// POST /create/ - submit a new post, then land on the author's profile.
pub async fn post_create(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    if let Some(error) = validate_post_form(&state, &form).await? {
        return render_post_form(
            &state,
            &identity,
            "/create/".to_string(),
            "New post",
            "Create",
            form.text,
            form.group,
            form.image_url,
            Some(error),
        )
        .await;
    }

    let post = Post::new(
        identity.user_id,
        form.text.trim().to_string(),
        form.group,
        form.image_url,
    );
    let post = state.posts.save(post).await?;
    tracing::info!(post_id = %post.id, author = %identity.username, "Post created");

    Ok(redirect(format!("/profile/{}/", identity.username)))
}

/// GET /posts/{id}/edit/ - the edit form, authors only.
pub async fn post_edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))?;

    // Non-authors are sent back to the post, not shown an error
    if post.author_id != identity.user_id {
        return Ok(redirect(format!("/posts/{post_id}/")));
    }

    render_post_form(
        &state,
        &identity,
        format!("/posts/{post_id}/edit/"),
        "Edit post",
        "Save",
        post.text,
        post.group_id,
        post.image_url,
        None,
    )
    .await
}

/// POST /posts/{id}/edit/ - apply the edit. The publication timestamp
/// never changes.
pub async fn post_edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let mut post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))?;

    if post.author_id != identity.user_id {
        return Ok(redirect(format!("/posts/{post_id}/")));
    }

    let form = form.into_inner();

    if let Some(error) = validate_post_form(&state, &form).await? {
        return render_post_form(
            &state,
            &identity,
            format!("/posts/{post_id}/edit/"),
            "Edit post",
            "Save",
            form.text,
            form.group,
            form.image_url,
            Some(error),
        )
        .await;
    }

    post.text = form.text.trim().to_string();
    post.group_id = form.group;
    post.image_url = form.image_url;
    state.posts.update(post).await?;

    Ok(redirect(format!("/posts/{post_id}/")))
}

async fn validate_post_form(state: &AppState, form: &PostForm) -> AppResult<Option<String>> {
    if form.text.trim().is_empty() {
        return Ok(Some("The post text cannot be empty.".to_string()));
    }

    if let Some(group_id) = form.group {
        if state.groups.find_by_id(group_id).await?.is_none() {
            return Ok(Some("Choose an existing group.".to_string()));
        }
    }

    Ok(None)
}

/// POST /posts/{id}/comment/ - attach a comment and return to the post.
/// Blank text falls through to the redirect without creating anything.
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))?;

    let text = form.text.trim();
    if !text.is_empty() {
        state
            .comments
            .save(Comment::new(post.id, identity.user_id, text.to_string()))
            .await?;
    }

    Ok(redirect(format!("/posts/{post_id}/")))
}

/// GET /profile/{username}/follow/ - subscribe to an author.
///
/// Idempotent: an existing edge is left alone, and following yourself
/// is a no-op rather than an error page.
pub async fn profile_follow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{username}'")))?;

    if author.id == identity.user_id {
        tracing::debug!(user = %identity.username, "Ignoring self-follow");
        return Ok(redirect(format!("/profile/{username}/")));
    }

    if !state.follows.exists(identity.user_id, author.id).await? {
        match state.follows.save(Follow::new(identity.user_id, author.id)).await {
            Ok(_) => {}
            // A concurrent follow hit the unique index first; same outcome
            Err(RepoError::Constraint(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(redirect(format!("/profile/{username}/")))
}

/// GET /profile/{username}/unfollow/ - drop the subscription.
/// 404 when the viewer was not following the author.
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{username}'")))?;

    match state.follows.delete_edge(identity.user_id, author.id).await {
        Ok(()) => Ok(redirect(format!("/profile/{username}/"))),
        Err(RepoError::NotFound) => Err(AppError::NotFound(format!(
            "no follow edge to '{username}'"
        ))),
        Err(e) => Err(e.into()),
    }
}
