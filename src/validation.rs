use serde::{Deserialize, Deserializer};

use crate::error::{AppError, AppResult, FieldError, FieldErrors};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const EMAIL_TAKEN: &str = "user with this email already exists.";
pub const NICKNAME_TAKEN: &str = "profile with this nickname already exists.";
pub const HASHTAG_TAKEN: &str = "hashtag with this name already exists.";

/// Collects field errors so one response can report all of them.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let entry = self
            .errors
            .entry(field.to_string())
            .or_insert_with(|| FieldError::Messages(Vec::new()));
        if let FieldError::Messages(messages) = entry {
            messages.push(message.into());
        }
    }

    /// Report the errors collected for a nested object under `field`.
    pub fn nest(&mut self, field: &str, inner: Validator) {
        if !inner.errors.is_empty() {
            self.errors
                .insert(field.to_string(), FieldError::Nested(inner.errors));
        }
    }

    /// A present, non-blank string no longer than `max` characters.
    /// Returns the trimmed value when valid.
    pub fn required_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        match value {
            None => {
                self.add(field, REQUIRED);
                None
            }
            Some(v) => self.text(field, v, max),
        }
    }

    /// Like [`Validator::required_text`] for a value known to be present.
    pub fn text(&mut self, field: &str, value: &str, max: usize) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, BLANK);
            return None;
        }
        if trimmed.chars().count() > max {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
            return None;
        }
        Some(trimmed.to_string())
    }

    #[cfg(test)]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        bio: Option<Option<String>>,
    }

    #[test]
    fn required_text_reports_missing_and_blank() {
        let mut v = Validator::new();
        assert!(v.required_text("title", None, 10).is_none());
        assert!(v.required_text("nickname", Some("   "), 10).is_none());
        assert!(!v.is_valid());

        match v.finish() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors["title"].messages(), [REQUIRED.to_string()]);
                assert_eq!(errors["nickname"].messages(), [BLANK.to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn text_enforces_max_length_and_trims() {
        let mut v = Validator::new();
        assert_eq!(v.text("name", "  box ", 3).as_deref(), Some("box"));
        assert!(v.text("name", "boxes", 3).is_none());
        assert!(!v.is_valid());
    }

    #[test]
    fn nested_errors_group_under_parent() {
        let mut inner = Validator::new();
        inner.add("email", EMAIL_TAKEN);
        let mut v = Validator::new();
        v.nest("user", inner);
        v.nest("empty", Validator::new());

        match v.finish() {
            Err(AppError::Validation(errors)) => {
                assert!(!errors.contains_key("empty"));
                match &errors["user"] {
                    FieldError::Nested(inner) => {
                        assert_eq!(inner["email"].messages(), [EMAIL_TAKEN.to_string()])
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn double_option_separates_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.bio, None);
        let null: Patch = serde_json::from_str(r#"{"bio": null}"#).unwrap();
        assert_eq!(null.bio, Some(None));
        let set: Patch = serde_json::from_str(r#"{"bio": "hi"}"#).unwrap();
        assert_eq!(set.bio, Some(Some("hi".to_string())));
    }
}
