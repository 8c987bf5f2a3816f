use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use super::KnowledgeSource;

/// Queries longer than this are cut before they are sent
pub const MAX_QUERY_CHARS: usize = 300;
/// Lookup results are cut to this many characters
pub const MAX_RESULT_CHARS: usize = 4000;
/// Number of pages or papers folded into one result
pub const TOP_K_RESULTS: usize = 3;

pub const NO_WIKIPEDIA_RESULT: &str = "No good Wikipedia Search Result was found";
pub const NO_ARXIV_RESULT: &str = "No good Arxiv Result was found";

/// General-encyclopedic lookup against the MediaWiki action API
pub struct WikipediaLookup {
    client: Client,
    base_url: String,
}

impl WikipediaLookup {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl KnowledgeSource for WikipediaLookup {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn lookup(&self, query: &str) -> anyhow::Result<String> {
        let query = truncate_chars(query, MAX_QUERY_CHARS);
        let url = format!(
            "{}/w/api.php?action=query&format=json&generator=search&gsrsearch={}&gsrlimit={}&prop=extracts&exintro=1&explaintext=1&redirects=1",
            self.base_url,
            urlencoding::encode(&query),
            TOP_K_RESULTS
        );

        info!("Searching Wikipedia for: {}", query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Wikipedia search request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Wikipedia search failed: {}", response.status()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Wikipedia response: {}", e))?;

        let mut pages: Vec<&Value> = match data["query"]["pages"].as_object() {
            Some(pages) => pages.values().collect(),
            None => Vec::new(),
        };
        pages.sort_by_key(|page| page["index"].as_u64().unwrap_or(u64::MAX));

        let summaries: Vec<String> = pages
            .iter()
            .take(TOP_K_RESULTS)
            .filter_map(|page| {
                let title = page["title"].as_str()?;
                let extract = page["extract"].as_str().unwrap_or_default();
                Some(format!("Page: {}\nSummary: {}", title, extract.trim()))
            })
            .collect();

        if summaries.is_empty() {
            warn!("No Wikipedia pages found for: {}", query);
            return Ok(NO_WIKIPEDIA_RESULT.to_string());
        }

        info!("Wikipedia returned {} pages", summaries.len());
        Ok(truncate_chars(&summaries.join("\n\n"), MAX_RESULT_CHARS))
    }
}

/// Academic-preprint lookup against the arXiv Atom API
pub struct ArxivLookup {
    client: Client,
    base_url: String,
}

impl ArxivLookup {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl KnowledgeSource for ArxivLookup {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn lookup(&self, query: &str) -> anyhow::Result<String> {
        let query = truncate_chars(query, MAX_QUERY_CHARS);
        let url = format!(
            "{}/api/query?search_query={}&start=0&max_results={}",
            self.base_url,
            urlencoding::encode(&format!("all:{}", query)),
            TOP_K_RESULTS
        );

        info!("Searching arXiv for: {}", query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("arXiv search request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("arXiv search failed: {}", response.status()));
        }

        let feed = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read arXiv response: {}", e))?;

        let papers: Vec<String> = parse_arxiv_feed(&feed)
            .into_iter()
            .take(TOP_K_RESULTS)
            .map(|paper| {
                format!(
                    "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                    paper.published,
                    paper.title,
                    paper.authors.join(", "),
                    paper.summary
                )
            })
            .collect();

        if papers.is_empty() {
            warn!("No arXiv papers found for: {}", query);
            return Ok(NO_ARXIV_RESULT.to_string());
        }

        info!("arXiv returned {} papers", papers.len());
        Ok(truncate_chars(&papers.join("\n\n"), MAX_RESULT_CHARS))
    }
}

#[derive(Debug, PartialEq)]
struct ArxivPaper {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

fn parse_arxiv_feed(xml: &str) -> Vec<ArxivPaper> {
    xml.split("<entry>")
        .skip(1)
        .filter_map(|entry| {
            let title = extract_xml_value(entry, "title")?;
            let summary = extract_xml_value(entry, "summary").unwrap_or_default();
            let published = extract_xml_value(entry, "updated")
                .or_else(|| extract_xml_value(entry, "published"))
                .map(|date| date.chars().take(10).collect())
                .unwrap_or_default();
            let authors = entry
                .split("<author>")
                .skip(1)
                .filter_map(|author| extract_xml_value(author, "name"))
                .collect();

            Some(ArxivPaper {
                published,
                title,
                authors,
                summary,
            })
        })
        .collect()
}

/// Text between `<tag ...>` and `</tag>`, whitespace collapsed and entities decoded
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let start = xml.find(&open)?;
    let content_start = xml[start..].find('>')? + start + 1;
    let end = xml[content_start..].find(&close)? + content_start;

    let text = xml[content_start..end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(decode_entities(&text))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:fever</title>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <updated>2021-01-02T10:00:00Z</updated>
    <published>2021-01-01T10:00:00Z</published>
    <title>Fever Detection
      from Wearables</title>
    <summary>  We study fever &amp; inflammation.
    </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00002v1</id>
    <updated>2021-02-03T10:00:00Z</updated>
    <title>Second Paper</title>
    <summary>Another abstract.</summary>
    <author><name>Grace Hopper</name></author>
  </entry>
</feed>"#;

    #[test]
    fn parses_atom_entries() {
        let papers = parse_arxiv_feed(FEED);
        assert_eq!(papers.len(), 2);
        assert_eq!(
            papers[0],
            ArxivPaper {
                published: "2021-01-02".to_string(),
                title: "Fever Detection from Wearables".to_string(),
                authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
                summary: "We study fever & inflammation.".to_string(),
            }
        );
        assert_eq!(papers[1].authors, vec!["Grace Hopper".to_string()]);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("fièvre", 3), "fiè");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[tokio::test]
    async fn arxiv_lookup_formats_papers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("search_query", "all:fever"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let lookup = ArxivLookup::new(Client::new(), &server.uri());
        let result = lookup.lookup("fever").await.unwrap();

        assert!(result.starts_with(
            "Published: 2021-01-02\nTitle: Fever Detection from Wearables\nAuthors: Ada Lovelace, Alan Turing\nSummary: We study fever & inflammation."
        ));
        assert!(result.contains("\n\nPublished: 2021-02-03\nTitle: Second Paper"));
    }

    #[tokio::test]
    async fn arxiv_lookup_without_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<feed><title>empty</title></feed>"),
            )
            .mount(&server)
            .await;

        let lookup = ArxivLookup::new(Client::new(), &server.uri());
        assert_eq!(lookup.lookup("zzzz").await.unwrap(), NO_ARXIV_RESULT);
    }

    #[tokio::test]
    async fn wikipedia_lookup_orders_pages_by_rank() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "query": {
                "pages": {
                    "200": { "pageid": 200, "title": "Hyperthermia", "index": 2, "extract": "Elevated body temperature." },
                    "100": { "pageid": 100, "title": "Fever", "index": 1, "extract": "Fever is a rise in temperature.\n" }
                }
            }
        });
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("gsrsearch", "fever"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let lookup = WikipediaLookup::new(Client::new(), &format!("{}/", server.uri()));
        let result = lookup.lookup("fever").await.unwrap();

        assert_eq!(
            result,
            "Page: Fever\nSummary: Fever is a rise in temperature.\n\nPage: Hyperthermia\nSummary: Elevated body temperature."
        );
    }

    #[tokio::test]
    async fn wikipedia_lookup_without_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "batchcomplete": "" })),
            )
            .mount(&server)
            .await;

        let lookup = WikipediaLookup::new(Client::new(), &server.uri());
        assert_eq!(lookup.lookup("qwxz").await.unwrap(), NO_WIKIPEDIA_RESULT);
    }

    #[tokio::test]
    async fn server_errors_fail_the_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let wiki = WikipediaLookup::new(Client::new(), &server.uri());
        assert!(wiki.lookup("fever").await.is_err());

        let arxiv = ArxivLookup::new(Client::new(), &server.uri());
        assert!(arxiv.lookup("fever").await.is_err());
    }
}
