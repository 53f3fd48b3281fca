use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    error::FetchError,
    model::{Item, UNTITLED},
    ytdlp::{Tool, listing_args},
};

/// The fields we read from each `--dump-json` line; everything else is ignored.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

/// Runs the metadata dump for `url` and returns its entries in emitted order.
pub async fn fetch_items(tool: &Tool, url: &str) -> Result<Vec<Item>, FetchError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(FetchError::EmptyUrl);
    }

    info!(%url, "listing url");
    let output = tool
        .command(listing_args(url))
        .output()
        .await
        .map_err(FetchError::Spawn)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(code = ?output.status.code(), %stderr, "listing failed");
        return Err(FetchError::CommandFailed {
            code: output.status.code(),
            stderr,
        });
    }

    let items = parse_listing(&String::from_utf8_lossy(&output.stdout))?;
    debug!(count = items.len(), "listing parsed");
    Ok(items)
}

/// Parses newline-delimited JSON objects. Blank lines are skipped; any other
/// line that does not carry an `id` aborts the whole listing.
pub fn parse_listing(stdout: &str) -> Result<Vec<Item>, FetchError> {
    stdout
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let entry: ListingEntry = serde_json::from_str(line).map_err(|source| {
                FetchError::InvalidEntry {
                    line_no: idx + 1,
                    source,
                }
            })?;
            Ok(Item {
                id: entry.id,
                title: entry.title.unwrap_or_else(|| UNTITLED.to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_emitted_order() {
        let out = concat!(
            r#"{"id":"C","title":"Third","duration":10}"#, "\n",
            r#"{"id":"A","title":"First"}"#, "\n",
            r#"{"id":"B","title":"Second","_type":"url"}"#, "\n",
        );
        let items = parse_listing(out).expect("valid listing");
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["C", "A", "B"]);
        assert_eq!(items[0].title, "Third");
    }

    #[test]
    fn missing_title_gets_placeholder() {
        let items = parse_listing("{\"id\":\"x\"}\n{\"id\":\"y\",\"title\":null}\n").expect("valid");
        assert!(items.iter().all(|i| i.title == UNTITLED));
    }

    #[test]
    fn blank_output_is_an_empty_listing() {
        assert!(parse_listing("").expect("empty").is_empty());
        assert!(parse_listing("\n  \n").expect("blank").is_empty());
    }

    #[test]
    fn bad_line_aborts_with_its_number() {
        let out = "{\"id\":\"a\"}\nWARNING: not json\n{\"id\":\"b\"}\n";
        match parse_listing(out) {
            Err(FetchError::InvalidEntry { line_no, .. }) => assert_eq!(line_no, 2),
            other => panic!("expected InvalidEntry, got {other:?}"),
        }
    }

    #[test]
    fn entry_without_id_is_rejected() {
        assert!(matches!(
            parse_listing("{\"title\":\"orphan\"}"),
            Err(FetchError::InvalidEntry { line_no: 1, .. })
        ));
    }

    #[tokio::test]
    async fn empty_url_never_spawns() {
        // A program that cannot exist: reaching spawn would surface Spawn instead.
        let tool = Tool::new("/nonexistent/yt-dlp");
        assert!(matches!(fetch_items(&tool, "   ").await, Err(FetchError::EmptyUrl)));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let tool = Tool::new("/nonexistent/yt-dlp");
        assert!(matches!(
            fetch_items(&tool, "https://x/playlist").await,
            Err(FetchError::Spawn(_))
        ));
    }
}
