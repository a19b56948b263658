use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::StoredComment;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const PAGE_SIZE: usize = 100;
const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Everything collected for one video: its publish date and top-level comments.
pub struct FetchedVideo {
    pub video_id: String,
    pub published_at: String,
    pub comments: Vec<StoredComment>,
}

/// Fetch comment threads for a set of videos concurrently (bounded by a
/// semaphore). Results come back in the order the ids were given.
pub async fn fetch_videos(
    api_key: &str,
    video_ids: &[String],
    max_comments: usize,
    order: &str,
) -> Result<Vec<FetchedVideo>> {
    for id in video_ids {
        if !VIDEO_ID_RE.is_match(id) {
            return Err(anyhow!("'{}' does not look like a YouTube video id", id));
        }
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let order = order.to_string();

    let mut handles = Vec::with_capacity(video_ids.len());
    for video_id in video_ids {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let api_key = api_key.to_string();
        let video_id = video_id.clone();
        let order = order.clone();

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            fetch_one_video(&client, &api_key, &video_id, max_comments, &order).await
        }));
    }

    let mut fetched = Vec::with_capacity(handles.len());
    for handle in handles {
        fetched.push(handle.await??);
    }
    Ok(fetched)
}

async fn fetch_one_video(
    client: &Client,
    api_key: &str,
    video_id: &str,
    max_comments: usize,
    order: &str,
) -> Result<FetchedVideo> {
    let published_at = fetch_video_published_at(client, api_key, video_id).await?;

    let mut comments: Vec<StoredComment> = Vec::new();
    let mut page_token: Option<String> = None;

    while comments.len() < max_comments {
        let page_size = PAGE_SIZE.min(max_comments - comments.len());
        let mut request = client
            .get(format!("{}/commentThreads", API_BASE))
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("maxResults", &page_size.to_string()),
                ("order", order),
                ("textFormat", "plainText"),
                ("key", api_key),
            ]);
        if let Some(token) = &page_token {
            request = request.query(&[("pageToken", token.as_str())]);
        }

        let page: ThreadListResponse = send_with_retry(request, video_id).await?;

        for item in page.items {
            let snippet = item.snippet.top_level_comment.snippet;
            comments.push(StoredComment {
                comment_id: item.id,
                video_id: video_id.to_string(),
                video_published_at: published_at.clone(),
                published_at: snippet.published_at,
                updated_at: snippet.updated_at,
                like_count: snippet.like_count,
                total_reply_count: item.snippet.total_reply_count,
                text: snippet.text_display,
            });
            if comments.len() >= max_comments {
                break;
            }
        }

        page_token = page.next_page_token;
        if page_token.is_none() {
            break;
        }
    }

    info!("Fetched {} comments for {}", comments.len(), video_id);
    Ok(FetchedVideo {
        video_id: video_id.to_string(),
        published_at,
        comments,
    })
}

async fn fetch_video_published_at(
    client: &Client,
    api_key: &str,
    video_id: &str,
) -> Result<String> {
    let request = client.get(format!("{}/videos", API_BASE)).query(&[
        ("part", "snippet"),
        ("id", video_id),
        ("key", api_key),
    ]);

    let response: VideoListResponse = send_with_retry(request, video_id).await?;
    Ok(response
        .items
        .into_iter()
        .next()
        .map(|item| item.snippet.published_at)
        .unwrap_or_default())
}

/// Issue a request, retrying on 429 and 5xx with exponential backoff.
async fn send_with_retry<T: for<'de> Deserialize<'de>>(
    request: reqwest::RequestBuilder,
    video_id: &str,
) -> Result<T> {
    for attempt in 0..=MAX_RETRIES {
        let request = request
            .try_clone()
            .ok_or_else(|| anyhow!("Request not cloneable"))?;
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .with_context(|| format!("Malformed API response for {}", video_id));
        }

        let retryable = status.as_u16() == 429 || status.is_server_error();
        if !retryable || attempt == MAX_RETRIES {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "API request for {} failed with {}: {}",
                video_id,
                status,
                body
            ));
        }

        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            "Got {} for {} (attempt {}/{}), backing off {:.1}s",
            status,
            video_id,
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
    }

    unreachable!("retry loop always returns")
}

// ── API response shapes ──

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    snippet: VideoSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    published_at: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    #[serde(default)]
    items: Vec<ThreadItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ThreadItem {
    id: String,
    snippet: ThreadSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    #[serde(default)]
    total_reply_count: i64,
    top_level_comment: TopLevelComment,
}

#[derive(Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    updated_at: String,
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    text_display: String,
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_shape() {
        assert!(VIDEO_ID_RE.is_match("hj50Suuh5DM"));
        assert!(VIDEO_ID_RE.is_match("Ygtmbwj0sV4"));
        assert!(!VIDEO_ID_RE.is_match("not a video"));
        assert!(!VIDEO_ID_RE.is_match("tooshort"));
    }

    #[test]
    fn thread_response_parses() {
        let raw = r#"{
            "items": [{
                "id": "abc123",
                "snippet": {
                    "totalReplyCount": 2,
                    "topLevelComment": {
                        "snippet": {
                            "publishedAt": "2024-01-05T10:00:00Z",
                            "updatedAt": "2024-01-05T10:00:00Z",
                            "likeCount": 7,
                            "textDisplay": "投票行くよ"
                        }
                    }
                }
            }],
            "nextPageToken": "tok"
        }"#;
        let parsed: ThreadListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].snippet.total_reply_count, 2);
        assert_eq!(
            parsed.items[0].snippet.top_level_comment.snippet.like_count,
            7
        );
        assert_eq!(parsed.next_page_token.as_deref(), Some("tok"));
    }

    #[test]
    fn missing_fields_default() {
        let raw = r#"{"items": [{"id": "x", "snippet": {"topLevelComment": {"snippet": {}}}}]}"#;
        let parsed: ThreadListResponse = serde_json::from_str(raw).unwrap();
        let snippet = &parsed.items[0].snippet.top_level_comment.snippet;
        assert_eq!(snippet.like_count, 0);
        assert!(snippet.text_display.is_empty());
        assert!(parsed.next_page_token.is_none());
    }
}
