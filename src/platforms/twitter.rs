use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use super::probe::{self, array, at, count, text};
use super::{Platform, PlatformClient, SearchContext, synthetic_id};
use crate::error::Result;
use crate::http::ApiRequest;
use crate::models::{Engagement, Post};

const SEARCH_PATH: &str = "/search-v2";
const TIMELINE_ITEM: &str = "TimelineTimelineItem";

pub struct TwitterClient {
    ctx: SearchContext,
    host: String,
}

impl TwitterClient {
    pub fn new(ctx: SearchContext, host: impl Into<String>) -> Self {
        Self {
            ctx,
            host: host.into(),
        }
    }

    fn request(&self, keyword: &str) -> ApiRequest {
        ApiRequest::new(self.host.clone(), SEARCH_PATH)
            .param("type", "Top")
            .param("count", self.ctx.max_posts.to_string())
            .param("query", keyword)
    }
}

#[async_trait]
impl PlatformClient for TwitterClient {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn search_posts(&self, keyword: &str) -> Result<Vec<Post>> {
        let limit = self.ctx.max_posts;
        self.ctx
            .fetch_posts(Platform::Twitter, keyword, self.request(keyword), |raw| {
                parse_timeline(raw, keyword, limit)
            })
            .await
    }
}

/// Walks the timeline instructions and maps every real tweet entry, up to
/// `limit`. Ads, cursors and module entries are dropped.
pub fn parse_timeline(raw: &Value, keyword: &str, limit: usize) -> Vec<Post> {
    let Some(instructions) = array(
        raw,
        &[
            "result/timeline/instructions",
            "data/search_by_raw_query/search_timeline/timeline/instructions",
            "timeline/instructions",
        ],
    ) else {
        warn!("Twitter response has no timeline instructions");
        return Vec::new();
    };

    instructions
        .iter()
        .flat_map(instruction_entries)
        .filter_map(tweet_of)
        .take(limit)
        .enumerate()
        .map(|(index, tweet)| parse_tweet(tweet, keyword, index))
        .collect()
}

fn instruction_entries(instruction: &Value) -> Vec<&Value> {
    if let Some(entries) = instruction.get("entries").and_then(Value::as_array) {
        return entries.iter().collect();
    }
    // TimelineReplaceEntry carries a single entry
    instruction.get("entry").into_iter().collect()
}

/// Resolves an entry to its tweet result, or `None` for anything that is
/// not a leaf tweet item.
fn tweet_of(entry: &Value) -> Option<&Value> {
    let content = entry.get("content")?;

    let entry_type = text(content, &["entryType", "__typename"]);
    if entry_type.as_deref() != Some(TIMELINE_ITEM) {
        return None;
    }

    let promoted = text(entry, &["entryId"]).is_some_and(|id| id.starts_with("promoted-"))
        || at(content, "itemContent/promotedMetadata").is_some();
    if promoted {
        debug!("Skipping promoted tweet");
        return None;
    }

    let result = at(content, "itemContent/tweet_results/result")?;
    // Tweets with visibility limits nest the real tweet one level down
    let tweet = match result.get("tweet") {
        Some(inner) if inner.get("legacy").is_some() => inner,
        _ => result,
    };

    tweet.get("legacy").filter(|l| l.is_object()).map(|_| tweet)
}

fn parse_tweet(tweet: &Value, keyword: &str, index: usize) -> Post {
    let user = at(tweet, "core/user_results/result");
    let screen_name =
        user.and_then(|u| text(u, &["legacy/screen_name", "core/screen_name", "screen_name"]));
    let author = screen_name
        .clone()
        .or_else(|| user.and_then(|u| text(u, &["legacy/name", "core/name", "name"])))
        .unwrap_or_else(|| "Twitter User".to_string());

    let tweet_id = text(
        tweet,
        &["legacy/id_str", "rest_id", "legacy/conversation_id_str"],
    );

    let url = match (&screen_name, &tweet_id) {
        (Some(name), Some(id)) => format!("https://twitter.com/{}/status/{}", name, id),
        _ => search_url(keyword),
    };

    let content = text(
        tweet,
        &[
            "note_tweet/note_tweet_results/result/text",
            "legacy/full_text",
            "legacy/text",
        ],
    )
    .unwrap_or_default();

    let created_at = text(tweet, &["legacy/created_at"])
        .and_then(|raw| probe::parse_datetime(&raw))
        .unwrap_or_else(Utc::now);

    Post {
        id: tweet_id.unwrap_or_else(|| synthetic_id(Platform::Twitter, index)),
        title: None,
        content,
        author,
        url,
        created_at,
        engagement: Some(Engagement {
            likes: count(tweet, &["legacy/favorite_count"]).unwrap_or(0),
            comments: count(tweet, &["legacy/reply_count"]).unwrap_or(0),
            shares: count(tweet, &["legacy/retweet_count"]).unwrap_or(0),
            views: count(tweet, &["views/count"]).unwrap_or(0),
            ratio: None,
        }),
    }
}

fn search_url(keyword: &str) -> String {
    Url::parse_with_params("https://twitter.com/search", &[("q", keyword)])
        .map(String::from)
        .unwrap_or_else(|_| "https://twitter.com/search".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::test_support::{CannedTransport, context};
    use chrono::TimeZone;
    use serde_json::json;

    fn tweet_entry(id: &str, screen_name: &str) -> Value {
        json!({
            "entryId": format!("tweet-{}", id),
            "content": {
                "entryType": "TimelineTimelineItem",
                "itemContent": {
                    "itemType": "TimelineTweet",
                    "tweet_results": {
                        "result": {
                            "__typename": "Tweet",
                            "rest_id": id,
                            "core": {
                                "user_results": {
                                    "result": {
                                        "legacy": {"screen_name": screen_name, "name": "Ferris"}
                                    }
                                }
                            },
                            "legacy": {
                                "id_str": id,
                                "full_text": "Borrow checker says hi",
                                "created_at": "Tue Oct 10 20:19:24 +0000 2023",
                                "favorite_count": 42,
                                "reply_count": 3,
                                "retweet_count": 5,
                                "quote_count": 1
                            },
                            "views": {"count": "9876"}
                        }
                    }
                }
            }
        })
    }

    fn timeline(entries: Vec<Value>) -> Value {
        json!({
            "result": {
                "timeline": {
                    "instructions": [
                        {"type": "TimelineClearCache"},
                        {"type": "TimelineAddEntries", "entries": entries}
                    ]
                }
            }
        })
    }

    #[test]
    fn maps_tweet_entries() {
        let raw = timeline(vec![tweet_entry("1700", "rustlang")]);
        let posts = parse_timeline(&raw, "rust", 10);

        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.id, "1700");
        assert_eq!(post.title, None);
        assert_eq!(post.content, "Borrow checker says hi");
        assert_eq!(post.author, "rustlang");
        assert_eq!(post.url, "https://twitter.com/rustlang/status/1700");
        assert_eq!(
            post.created_at,
            Utc.with_ymd_and_hms(2023, 10, 10, 20, 19, 24).unwrap()
        );
        let engagement = post.engagement.as_ref().unwrap();
        assert_eq!(engagement.likes, 42);
        assert_eq!(engagement.comments, 3);
        assert_eq!(engagement.shares, 5);
        assert_eq!(engagement.views, 9876);
    }

    #[test]
    fn drops_cursors_ads_modules_and_tombstones() {
        let mut promoted = tweet_entry("2", "brand");
        promoted["entryId"] = json!("promoted-tweet-2");

        let raw = timeline(vec![
            tweet_entry("1", "alice"),
            promoted,
            json!({
                "entryId": "cursor-bottom-0",
                "content": {"entryType": "TimelineTimelineCursor", "value": "DAAC"}
            }),
            json!({
                "entryId": "toptabsrpusermodule-1",
                "content": {"entryType": "TimelineTimelineModule", "items": []}
            }),
            json!({
                "entryId": "tweet-3",
                "content": {
                    "entryType": "TimelineTimelineItem",
                    "itemContent": {"tweet_results": {"result": {"__typename": "TweetTombstone"}}}
                }
            }),
            json!({
                "entryId": "tweet-4",
                "content": {"entryType": "TimelineTimelineItem", "itemContent": {"tweet_results": {}}}
            }),
        ]);

        let posts = parse_timeline(&raw, "rust", 10);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "alice");
    }

    #[test]
    fn unwraps_visibility_results_and_new_user_core() {
        let raw = timeline(vec![json!({
            "entryId": "tweet-9",
            "content": {
                "__typename": "TimelineTimelineItem",
                "itemContent": {
                    "tweet_results": {
                        "result": {
                            "__typename": "TweetWithVisibilityResults",
                            "tweet": {
                                "rest_id": "9",
                                "core": {"user_results": {"result": {"core": {"screen_name": "bob"}}}},
                                "legacy": {"full_text": "limited"}
                            }
                        }
                    }
                }
            }
        })]);

        let posts = parse_timeline(&raw, "rust", 10);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "9");
        assert_eq!(posts[0].author, "bob");
        assert_eq!(posts[0].url, "https://twitter.com/bob/status/9");
        assert_eq!(posts[0].engagement.as_ref().unwrap().views, 0);
    }

    #[test]
    fn missing_user_falls_back_to_search_url() {
        let raw = timeline(vec![json!({
            "content": {
                "entryType": "TimelineTimelineItem",
                "itemContent": {"tweet_results": {"result": {"legacy": {}}}}
            }
        })]);

        let posts = parse_timeline(&raw, "rust lang", 10);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "Twitter User");
        assert_eq!(posts[0].url, "https://twitter.com/search?q=rust+lang");
        assert!(posts[0].id.starts_with("twitter-"));
        assert_eq!(posts[0].content, "");
    }

    #[test]
    fn limit_applies_after_filtering() {
        let raw = timeline(vec![
            json!({"content": {"entryType": "TimelineTimelineCursor"}}),
            tweet_entry("1", "a"),
            tweet_entry("2", "b"),
            tweet_entry("3", "c"),
        ]);
        let posts = parse_timeline(&raw, "rust", 2);
        assert_eq!(
            posts.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
    }

    #[test]
    fn unexpected_shapes_degrade_to_empty() {
        assert!(parse_timeline(&json!({}), "rust", 10).is_empty());
        assert!(parse_timeline(&json!({"result": {"timeline": {}}}), "rust", 10).is_empty());
        assert!(parse_timeline(&json!({"result": {"timeline": {"instructions": [1, "x", null]}}}), "rust", 10).is_empty());
    }

    #[tokio::test]
    async fn search_sends_count_and_type() {
        let transport = CannedTransport::ok(timeline(vec![tweet_entry("1", "a")]));
        let client = TwitterClient::new(context(transport.clone(), 5), "twitter241.p.rapidapi.com");

        let posts = client.search_posts("rust").await.unwrap();
        assert_eq!(posts.len(), 1);

        let request = transport.requests.lock().unwrap()[0].clone();
        assert_eq!(request.url(), "https://twitter241.p.rapidapi.com/search-v2");
        assert_eq!(request.query_value("type"), Some("Top"));
        assert_eq!(request.query_value("count"), Some("5"));
        assert_eq!(request.query_value("query"), Some("rust"));
    }
}
