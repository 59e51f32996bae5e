//! # Quill Shared
//!
//! Types shared between the web layer and the crates beneath it.

pub mod forms;

pub use forms::{CommentForm, LoginForm, PostForm, SignupForm};
