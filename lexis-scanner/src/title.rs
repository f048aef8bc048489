use crate::error::{Result, ScanError};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

/// Where the book detail page keeps the book's display name.
pub const TITLE_SELECTOR: &str = ".rightTop span";

/// Text of the first element matching [`TITLE_SELECTOR`].
///
/// Runs of whitespace, including the newlines and indentation the page wraps
/// around the name, are collapsed to single spaces so the title can be used as
/// a file name. The raw `textContent` is not kept.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(TITLE_SELECTOR).ok()?;

    document.select(&selector).next().and_then(|element| {
        let text = element
            .text()
            .flat_map(|t| t.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() { None } else { Some(text) }
    })
}

/// Fetch a book detail page and pull its title out. `Ok(None)` when the page
/// loads but has no title element.
pub async fn fetch_page_title(client: &Client, page_url: &str) -> Result<Option<String>> {
    debug!("Fetching book page {}", page_url);

    let response = client.get(page_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScanError::Status {
            url: page_url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    Ok(extract_title(&body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    #[test]
    fn test_extract_title_from_right_top() {
        let html = r#"<html><body>
            <div class="leftTop"><span>Menu</span></div>
            <div class="rightTop"><span>
                Oxford   Learner's
                Dictionary
            </span><span>Second</span></div>
        </body></html>"#;

        assert_eq!(
            extract_title(html),
            Some("Oxford Learner's Dictionary".to_string())
        );
    }

    #[test]
    fn test_extract_title_missing() {
        assert_eq!(extract_title("<html><body><p>nothing</p></body></html>"), None);
        assert_eq!(
            extract_title(r#"<div class="rightTop"><span>   </span></div>"#),
            None
        );
    }

    #[tokio::test]
    async fn test_fetch_page_title() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rbook/bookdetail"))
            .and(query_param("bookid", "R77"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(r#"<div class="rightTop"><span>词汇手册</span></div>"#),
            )
            .mount(&server)
            .await;

        let url = format!("{}/rbook/bookdetail?bookid=R77", server.uri());
        let title = fetch_page_title(&Client::new(), &url).await.unwrap();

        assert_eq!(title, Some("词汇手册".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_page_title_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_page_title(&Client::new(), &server.uri())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
