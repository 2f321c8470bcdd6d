use serde::{Deserialize, Serialize};

/// Suffix on `baseUrl` that requests the original-quality photo bytes.
pub const PHOTO_DOWNLOAD_SUFFIX: &str = "=d";
/// Suffix on `baseUrl` that requests the playable video bytes.
pub const VIDEO_DOWNLOAD_SUFFIX: &str = "=dv";

/// A single photo or video as returned by `mediaItems:search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub media_metadata: MediaMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// RFC 3339 capture time, e.g. `2021-03-05T10:00:00Z`.
    #[serde(default)]
    pub creation_time: String,
    /// Present (possibly empty) for photos, absent for everything else.
    #[serde(default)]
    pub photo: Option<serde_json::Value>,
}

impl MediaItem {
    pub fn is_photo(&self) -> bool {
        self.media_metadata.photo.is_some()
    }

    /// URL of the full-resolution content for this item.
    pub fn download_url(&self) -> String {
        let suffix = if self.is_photo() {
            PHOTO_DOWNLOAD_SUFFIX
        } else {
            VIDEO_DOWNLOAD_SUFFIX
        };
        format!("{}{}", self.base_url, suffix)
    }
}

/// One page of search results plus the cursor for the next one.
/// An empty `next_page_token` means this was the last page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPage {
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    pub page_size: u32,
    #[serde(skip_serializing_if = "is_first_page")]
    pub page_token: &'a str,
}

fn is_first_page(token: &&str) -> bool {
    token.is_empty()
}

#[cfg(test)]
impl MediaItem {
    pub(crate) fn photo(id: &str, filename: &str, creation_time: &str) -> Self {
        Self {
            id: id.to_string(),
            filename: filename.to_string(),
            base_url: format!("https://lh3.example/{id}"),
            mime_type: Some("image/jpeg".to_string()),
            media_metadata: MediaMetadata {
                creation_time: creation_time.to_string(),
                photo: Some(serde_json::json!({})),
            },
        }
    }

    pub(crate) fn video(id: &str, filename: &str, creation_time: &str) -> Self {
        Self {
            id: id.to_string(),
            filename: filename.to_string(),
            base_url: format!("https://lh3.example/{id}"),
            mime_type: Some("video/mp4".to_string()),
            media_metadata: MediaMetadata {
                creation_time: creation_time.to_string(),
                photo: None,
            },
        }
    }
}
