//! Form payloads - the urlencoded bodies posted by the HTML pages.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Signup form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login form. `next` is the hidden return-target field carried over
/// from the login redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default, deserialize_with = "empty_trimmed_as_none")]
    pub next: Option<String>,
}

/// Post create/edit form. The group selector submits an empty string
/// when "no group" is chosen, so the field needs the empty-as-none
/// deserializer below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostForm {
    pub text: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub group: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_trimmed_as_none")]
    pub image_url: Option<String>,
}

/// Comment form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

/// Deserialize an optional field where the empty string means absent.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Same as above for free-text optional fields.
fn empty_trimmed_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_form_empty_group_is_none() {
        let form: PostForm =
            serde_urlencoded::from_str("text=hello&group=&image_url=").unwrap();
        assert_eq!(form.text, "hello");
        assert!(form.group.is_none());
        assert!(form.image_url.is_none());
    }

    #[test]
    fn test_post_form_with_group() {
        let id = Uuid::new_v4();
        let body = format!("text=hello&group={id}&image_url=https%3A%2F%2Fx.test%2Fa.png");
        let form: PostForm = serde_urlencoded::from_str(&body).unwrap();
        assert_eq!(form.group, Some(id));
        assert_eq!(form.image_url.as_deref(), Some("https://x.test/a.png"));
    }

    #[test]
    fn test_post_form_missing_optional_fields() {
        let form: PostForm = serde_urlencoded::from_str("text=hi").unwrap();
        assert!(form.group.is_none());
        assert!(form.image_url.is_none());
    }
}
