//! Dish badges from the catalog, with icons resolved at ingestion.
//!
//! The catalog stores a free-form `iconType` plus optional emoji, symbol name
//! and image fields. [`Badge::try_from`] turns that into a closed
//! [`BadgeIcon`] variant once, so renderers never look icons up by name.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Icon attached to a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BadgeIcon {
    Image { url: String },
    Symbol { name: String, outline: bool },
    Emoji { glyph: String, outline: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BadgeCategory {
    Diet,
    Ingredient,
    Dessert,
    Drink,
}

/// Badge record as stored in the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBadge {
    pub title: String,
    pub title_en: Option<String>,
    pub category: Option<BadgeCategory>,
    pub icon_type: Option<String>,
    pub emoji: Option<String>,
    pub lucide_icon: Option<String>,
    pub icon: Option<RawImage>,
    pub is_outline: Option<bool>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub url: Option<String>,
}

/// Badge ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_en: Option<String>,
    pub category: BadgeCategory,
    pub icon: BadgeIcon,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl TryFrom<RawBadge> for Badge {
    type Error = CoreError;

    fn try_from(raw: RawBadge) -> Result<Self, Self::Error> {
        let title = raw.title.trim().to_owned();
        if title.is_empty() {
            return Err(CoreError::InvalidBadge("title is required".to_owned()));
        }
        let category = raw
            .category
            .ok_or_else(|| CoreError::InvalidBadge(format!("badge '{title}' has no category")))?;
        let outline = raw.is_outline.unwrap_or(false);

        let icon = match raw.icon_type.as_deref().unwrap_or("emoji") {
            "emoji" => BadgeIcon::Emoji {
                glyph: non_empty(raw.emoji).ok_or_else(|| {
                    CoreError::InvalidBadge(format!("badge '{title}' has no emoji"))
                })?,
                outline,
            },
            "lucide" => BadgeIcon::Symbol {
                name: non_empty(raw.lucide_icon).ok_or_else(|| {
                    CoreError::InvalidBadge(format!("badge '{title}' has no icon name"))
                })?,
                outline,
            },
            "image" => BadgeIcon::Image {
                url: non_empty(raw.icon.and_then(|img| img.url)).ok_or_else(|| {
                    CoreError::InvalidBadge(format!("badge '{title}' has no image"))
                })?,
            },
            other => {
                return Err(CoreError::InvalidBadge(format!(
                    "badge '{title}' has unknown icon type '{other}'"
                )));
            },
        };

        Ok(Self {
            title,
            title_en: non_empty(raw.title_en),
            category,
            icon,
            color: non_empty(raw.color),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawBadge {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn emoji_is_the_default_icon_type() {
        let badge =
            Badge::try_from(raw(r#"{"title":"Vegan","category":"DIET","emoji":"🌱"}"#)).unwrap();
        assert_eq!(badge.icon, BadgeIcon::Emoji { glyph: "🌱".to_owned(), outline: false });
    }

    #[test]
    fn symbol_icon_keeps_outline_flag() {
        let badge = Badge::try_from(raw(
            r#"{"title":"Spicy","category":"INGREDIENT","iconType":"lucide","lucideIcon":"Flame","isOutline":true}"#,
        ))
        .unwrap();
        assert_eq!(badge.icon, BadgeIcon::Symbol { name: "Flame".to_owned(), outline: true });
    }

    #[test]
    fn image_icon_requires_url() {
        let err = Badge::try_from(raw(r#"{"title":"House","category":"DRINK","iconType":"image"}"#))
            .unwrap_err();
        assert!(err.to_string().contains("no image"));
    }

    #[test]
    fn unknown_icon_type_is_rejected() {
        let err = Badge::try_from(raw(
            r#"{"title":"Odd","category":"DESSERT","iconType":"sticker","emoji":"🍰"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBadge(_)));
    }

    #[test]
    fn icon_serializes_as_tagged_variant() {
        let icon = BadgeIcon::Image { url: "https://cdn/x.svg".to_owned() };
        let json = serde_json::to_value(&icon).unwrap();
        assert_eq!(json["kind"], "image");
    }
}
