//! Field-rule validation for story input.
//!
//! Each field carries an ordered list of [`Rule`]s. Every field is checked and
//! all failures are collected into [`FieldErrors`], so a single 422 response
//! reports everything that is wrong with the request.

use std::collections::HashMap;
use std::io::Cursor;

use axum::body::Bytes;
use image::ImageFormat;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single submitted form value.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    /// JSON value that is not a string (number, bool, array, object).
    Other(serde_json::Value),
    File(UploadedFile),
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Size in kilobytes (1 KB = 1024 bytes).
    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }

    /// Image format detected from the file content, if it decodes as one.
    pub fn sniff_image(&self) -> Option<ImageFormat> {
        let reader = image::io::Reader::new(Cursor::new(&self.bytes[..]))
            .with_guessed_format()
            .ok()?;
        let format = reader.format()?;
        if !IMAGE_FORMATS.contains(&format) {
            return None;
        }
        reader.into_dimensions().ok().map(|_| format)
    }

    /// Extensions the sniffed content is known by.
    fn extensions(&self) -> &'static [&'static str] {
        match self.sniff_image() {
            Some(ImageFormat::Jpeg) => &["jpg", "jpeg"],
            Some(ImageFormat::Png) => &["png"],
            Some(ImageFormat::Gif) => &["gif"],
            Some(ImageFormat::Bmp) => &["bmp"],
            Some(ImageFormat::WebP) => &["webp"],
            _ => &[],
        }
    }
}

/// Formats accepted by [`Rule::Image`].
const IMAGE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Must be present and non-empty.
    Required,
    /// May be absent; remaining rules only run when a value is present.
    Nullable,
    String,
    /// Characters for text, kilobytes for files.
    Max(usize),
    Image,
    Mimes(&'static [&'static str]),
}

impl Rule {
    fn check(&self, field: &str, value: &FieldValue) -> Option<String> {
        match (self, value) {
            (Rule::Required, _) | (Rule::Nullable, _) => None,
            (Rule::String, FieldValue::Text(_)) => None,
            (Rule::String, _) => Some(format!("The {} field must be a string.", field)),
            (Rule::Max(max), FieldValue::Text(s)) if s.chars().count() > *max => Some(format!(
                "The {} field must not be greater than {} characters.",
                field, max
            )),
            (Rule::Max(max), FieldValue::File(file)) if file.size_kb() > *max as f64 => Some(format!(
                "The {} field must not be greater than {} kilobytes.",
                field, max
            )),
            (Rule::Max(_), _) => None,
            (Rule::Image, FieldValue::File(file)) if file.sniff_image().is_some() => None,
            (Rule::Image, _) => Some(format!("The {} field must be an image.", field)),
            (Rule::Mimes(allowed), FieldValue::File(file))
                if file.extensions().iter().any(|ext| allowed.contains(ext)) =>
            {
                None
            }
            (Rule::Mimes(allowed), _) => Some(format!(
                "The {} field must be a file of type: {}.",
                field,
                allowed.join(", ")
            )),
        }
    }
}

/// Rules for one named field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

pub const STORY_RULES: &[FieldRules] = &[
    FieldRules {
        field: "title",
        rules: &[Rule::Required, Rule::String, Rule::Max(255)],
    },
    FieldRules {
        field: "content",
        rules: &[Rule::Required, Rule::String],
    },
    FieldRules {
        field: "image",
        rules: &[Rule::Nullable, Rule::Image, Rule::Mimes(&["jpeg", "png", "jpg"]), Rule::Max(2048)],
    },
];

/// Field-keyed failure messages, serialized in rule order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        match self.0.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message.into()),
            None => self.0.push((field.to_string(), vec![message.into()])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn first_message(&self) -> Option<&str> {
        self.0.first().and_then(|(_, messages)| messages.first()).map(String::as_str)
    }

    pub fn message_count(&self) -> usize {
        self.0.iter().map(|(_, messages)| messages.len()).sum()
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// Submitted fields keyed by name. Blank text and empty file parts count as absent.
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    fields: HashMap<String, FieldValue>,
}

impl FormInput {
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match normalize(value) {
            Some(value) => {
                self.fields.insert(name, value);
            }
            None => {
                self.fields.remove(&name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        match self.fields.get(name) {
            Some(FieldValue::File(f)) => Some(f),
            _ => None,
        }
    }
}

fn normalize(value: FieldValue) -> Option<FieldValue> {
    match value {
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(FieldValue::Text(trimmed.to_string()))
            }
        }
        FieldValue::Other(serde_json::Value::Null) => None,
        FieldValue::File(file)
            if file.bytes.is_empty() && file.file_name.as_deref().map_or(true, str::is_empty) =>
        {
            None
        }
        other => Some(other),
    }
}

/// Run every rule set against the input and collect all failures.
pub fn validate(input: &FormInput, rule_sets: &[FieldRules]) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    for set in rule_sets {
        let value = match input.get(set.field) {
            Some(value) => value,
            None => {
                if set.rules.contains(&Rule::Required) {
                    errors.add(set.field, format!("The {} field is required.", set.field));
                }
                continue;
            }
        };

        for rule in set.rules {
            if let Some(message) = rule.check(set.field, value) {
                errors.add(set.field, message);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Story input that passed [`STORY_RULES`].
#[derive(Debug, Clone)]
pub struct StoryInput {
    pub title: String,
    pub content: String,
    pub image: Option<StoryImage>,
}

/// An accepted image upload and the extension it will be stored under.
#[derive(Debug, Clone)]
pub struct StoryImage {
    pub bytes: Bytes,
    pub extension: &'static str,
}

impl StoryInput {
    pub fn from_form(input: &FormInput) -> Result<Self, FieldErrors> {
        validate(input, STORY_RULES)?;

        let image = match input.file("image") {
            Some(file) => {
                let extension = match file.sniff_image() {
                    Some(ImageFormat::Png) => "png",
                    _ => "jpg",
                };
                Some(StoryImage {
                    bytes: file.bytes.clone(),
                    extension,
                })
            }
            None => None,
        };

        Ok(Self {
            title: input.text("title").unwrap_or_default().to_string(),
            content: input.text("content").unwrap_or_default().to_string(),
            image,
        })
    }
}
