//! Askama templates and the view models the pages render.
//!
//! Template structs are plain data holders; handlers assemble them from
//! domain entities and hand the rendered HTML to the response helpers.

use askama::Template;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quill_core::pagination::Page;

use crate::middleware::auth::Identity;

/// Header state shared by every page.
#[derive(Debug, Clone)]
pub struct Nav {
    pub logged_in: bool,
    pub username: String,
}

impl Nav {
    pub fn anonymous() -> Self {
        Self {
            logged_in: false,
            username: String::new(),
        }
    }

    pub fn for_viewer(viewer: &Option<Identity>) -> Self {
        match viewer {
            Some(identity) => Self::for_user(identity),
            None => Self::anonymous(),
        }
    }

    pub fn for_user(identity: &Identity) -> Self {
        Self {
            logged_in: true,
            username: identity.username.clone(),
        }
    }
}

/// Group reference attached to a post card.
#[derive(Debug, Clone)]
pub struct GroupRef {
    pub title: String,
    pub slug: String,
}

/// A post as shown in listings and on the detail page.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub author_username: String,
    pub group: Option<GroupRef>,
    pub image_url: Option<String>,
    pub published_at: String,
}

/// A comment row on the post detail page.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub author_username: String,
    pub text: String,
    pub created_at: String,
}

/// Group choice in the post form's selector.
#[derive(Debug, Clone)]
pub struct GroupChoice {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

/// Pager widget state.
#[derive(Debug, Clone)]
pub struct Pager {
    pub number: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_number: u64,
    pub next_number: u64,
}

impl Pager {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            number: page.number,
            total_pages: page.total_pages,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous_number: page.previous_number(),
            next_number: page.next_number(),
        }
    }
}

/// Timestamps as the pages print them.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y %H:%M").to_string()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub nav: Nav,
    pub posts: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub nav: Nav,
    pub posts: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupListTemplate {
    pub nav: Nav,
    pub group_title: String,
    pub group_description: String,
    pub posts: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub author_username: String,
    pub post_count: u64,
    pub following: bool,
    pub is_self: bool,
    pub posts: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub nav: Nav,
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentRow>,
    pub can_comment: bool,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub nav: Nav,
    pub heading: String,
    pub button_label: String,
    pub action: String,
    pub text: String,
    pub image_url: String,
    pub groups: Vec<GroupChoice>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub nav: Nav,
    pub username: String,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "404.html")]
pub struct NotFoundTemplate {
    pub nav: Nav,
}

#[derive(Template)]
#[template(path = "500.html")]
pub struct ServerErrorTemplate {
    pub nav: Nav,
}
