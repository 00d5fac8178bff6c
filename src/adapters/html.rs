use crate::domain::model::Anchor;
use crate::domain::ports::DocumentParser;
use crate::utils::error::{AuditError, Result};
use scraper::{Html, Selector};

/// 檢查前 1 KiB 是否含 NUL，用來辨識非文字內容（PDF、圖片等）
const SNIFF_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperParser;

impl ScraperParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for ScraperParser {
    fn find_links(&self, body: &str) -> Result<Vec<Anchor>> {
        let head = &body.as_bytes()[..body.len().min(SNIFF_LEN)];
        if head.contains(&0) {
            return Err(AuditError::ParseError {
                message: "response body is not text".to_string(),
            });
        }

        let document = Html::parse_document(body);
        let selector = Selector::parse("a").map_err(|e| AuditError::ParseError {
            message: format!("invalid selector: {}", e),
        })?;

        let anchors = document
            .select(&selector)
            .map(|element| Anchor {
                href: element.value().attr("href").map(str::to_string),
                text: element.text().collect::<String>(),
            })
            .collect();

        Ok(anchors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_links_in_document_order() {
        let html = r#"
            <html><body>
              <a href="/about">About <b>us</b></a>
              <a>No target</a>
              <footer><a href="/privacy">Privacy Policy</a></footer>
            </body></html>
        "#;

        let anchors = ScraperParser::new().find_links(html).unwrap();

        assert_eq!(anchors.len(), 3);
        assert_eq!(anchors[0], Anchor::new(Some("/about"), "About us"));
        assert_eq!(anchors[1], Anchor::new(None, "No target"));
        assert_eq!(anchors[2], Anchor::new(Some("/privacy"), "Privacy Policy"));
    }

    #[test]
    fn test_malformed_html_is_still_parsed() {
        let html = "<div><a href='/privacy'>privacy<div></span>";
        let anchors = ScraperParser::new().find_links(html).unwrap();

        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].href.as_deref(), Some("/privacy"));
    }

    #[test]
    fn test_binary_body_is_parse_error() {
        let body = "%PDF\0\x01\x02";
        let err = ScraperParser::new().find_links(body).unwrap_err();

        assert!(matches!(err, AuditError::ParseError { .. }));
    }

    #[test]
    fn test_cyrillic_text_is_kept() {
        let anchors = ScraperParser::new()
            .find_links(r#"<a href="/legal">Конфиденциальность</a>"#)
            .unwrap();

        assert_eq!(anchors, vec![Anchor::new(Some("/legal"), "Конфиденциальность")]);
    }
}
