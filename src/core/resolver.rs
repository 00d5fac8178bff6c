//! 隱私權政策連結的判斷邏輯。
//!
//! 兩輪掃描：先看超連結的可見文字，找不到才看 `href`。每一輪只取文件中
//! 第一個符合的連結。相對路徑以重新導向後的最終 URL 為基準展開。

use crate::adapters::ScraperParser;
use crate::domain::model::{
    Anchor, FetchOutcome, LinkCandidate, NormalizedUrl, ResolutionResult, SourceSignal,
};
use crate::domain::ports::{DocumentParser, Fetcher, Resolve};
use crate::utils::error::Result;
use async_trait::async_trait;
use url::Url;

pub const DEFAULT_PRIVACY_TERMS: &[&str] = &["privacy", "privacy policy", "policy"];

/// 比對用詞彙，一律轉小寫、去除空白與重複
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyTerms(Vec<String>);

impl PrivacyTerms {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !normalized.contains(&term) {
                normalized.push(term);
            }
        }
        Self(normalized)
    }

    pub fn matches(&self, haystack: &str) -> bool {
        self.0.iter().any(|term| haystack.contains(term.as_str()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for PrivacyTerms {
    fn default() -> Self {
        Self::new(DEFAULT_PRIVACY_TERMS.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    FirstMatch,
    CollectAll,
}

fn absolutize(base: &Url, href: &str) -> String {
    base.join(href.trim())
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.trim().to_string())
}

fn text_matches(anchor: &Anchor, terms: &PrivacyTerms) -> bool {
    terms.matches(anchor.text.to_lowercase().trim())
}

fn href_matches(href: &str, terms: &PrivacyTerms) -> bool {
    terms.matches(&href.to_lowercase())
}

fn usable_href(anchor: &Anchor) -> Option<&str> {
    anchor.href.as_deref().filter(|href| !href.trim().is_empty())
}

/// 第一個候選連結：文字比對優先，其次 `href` 比對
pub fn first_candidate(
    anchors: &[Anchor],
    base: &Url,
    terms: &PrivacyTerms,
) -> Option<LinkCandidate> {
    let by_text = anchors.iter().find_map(|anchor| {
        let href = usable_href(anchor)?;
        text_matches(anchor, terms).then(|| LinkCandidate {
            target_url: absolutize(base, href),
            source_signal: SourceSignal::AnchorText,
        })
    });

    by_text.or_else(|| {
        anchors.iter().find_map(|anchor| {
            let href = usable_href(anchor)?;
            href_matches(href, terms).then(|| LinkCandidate {
                target_url: absolutize(base, href),
                source_signal: SourceSignal::HrefPattern,
            })
        })
    })
}

/// 所有候選連結，文字比對在前、`href` 比對在後，各自保持文件順序並去除重複
pub fn all_candidates(anchors: &[Anchor], base: &Url, terms: &PrivacyTerms) -> Vec<LinkCandidate> {
    let mut candidates: Vec<LinkCandidate> = Vec::new();

    let text_pass = anchors.iter().filter_map(|anchor| {
        usable_href(anchor)
            .filter(|_| text_matches(anchor, terms))
            .map(|href| (SourceSignal::AnchorText, href))
    });
    let href_pass = anchors.iter().filter_map(|anchor| {
        usable_href(anchor)
            .filter(|href| href_matches(href, terms))
            .map(|href| (SourceSignal::HrefPattern, href))
    });

    for (signal, href) in text_pass.chain(href_pass) {
        let target_url = absolutize(base, href);
        if candidates.iter().all(|c| c.target_url != target_url) {
            candidates.push(LinkCandidate {
                target_url,
                source_signal: signal,
            });
        }
    }

    candidates
}

/// 已取得的頁面 → 分類結果。不做任何 I/O，同樣的輸入永遠得到同樣的結果。
pub fn classify_document<P: DocumentParser + ?Sized>(
    parser: &P,
    body: &str,
    effective_url: &str,
    terms: &PrivacyTerms,
    mode: MatchMode,
) -> ResolutionResult {
    let base = match Url::parse(effective_url) {
        Ok(base) => base,
        Err(e) => return ResolutionResult::Failed(format!("invalid url {}: {}", effective_url, e)),
    };

    let anchors = match parser.find_links(body) {
        Ok(anchors) => anchors,
        Err(e) => {
            // fetched but unreadable still counts as checked
            tracing::debug!("Treating {} as not found: {}", effective_url, e);
            return ResolutionResult::NotFound;
        }
    };

    match mode {
        MatchMode::FirstMatch => match first_candidate(&anchors, &base, terms) {
            Some(candidate) => ResolutionResult::Found(candidate.target_url),
            None => ResolutionResult::NotFound,
        },
        MatchMode::CollectAll => {
            let candidates = all_candidates(&anchors, &base, terms);
            if candidates.is_empty() {
                ResolutionResult::NotFound
            } else {
                let joined = candidates
                    .into_iter()
                    .map(|c| c.target_url)
                    .collect::<Vec<_>>()
                    .join("\n");
                ResolutionResult::Found(joined)
            }
        }
    }
}

pub fn classify_outcome<P: DocumentParser + ?Sized>(
    parser: &P,
    outcome: FetchOutcome,
    terms: &PrivacyTerms,
    mode: MatchMode,
) -> ResolutionResult {
    match outcome {
        FetchOutcome::TransportFailure(reason) => ResolutionResult::transport_failure(&reason),
        FetchOutcome::HttpError(status) => ResolutionResult::http_status(status),
        FetchOutcome::Success { status, .. } if !(200..300).contains(&status) => {
            ResolutionResult::http_status(status)
        }
        FetchOutcome::Success {
            body,
            effective_url,
            ..
        } => classify_document(parser, &body, &effective_url, terms, mode),
    }
}

pub struct LinkResolver<F: Fetcher, P: DocumentParser = ScraperParser> {
    fetcher: F,
    parser: P,
    terms: PrivacyTerms,
    mode: MatchMode,
}

impl<F: Fetcher> LinkResolver<F, ScraperParser> {
    pub fn new(fetcher: F, terms: PrivacyTerms) -> Self {
        Self::with_parser(fetcher, ScraperParser::new(), terms)
    }
}

impl<F: Fetcher, P: DocumentParser> LinkResolver<F, P> {
    pub fn with_parser(fetcher: F, parser: P, terms: PrivacyTerms) -> Self {
        Self {
            fetcher,
            parser,
            terms,
            mode: MatchMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn resolve_url(&self, url: &str) -> ResolutionResult {
        let normalized = NormalizedUrl::new(url);
        tracing::debug!("Checking site: {}", normalized);

        let outcome = self.fetcher.fetch(normalized.as_str()).await;
        let result = classify_outcome(&self.parser, outcome, &self.terms, self.mode);

        match &result {
            ResolutionResult::Found(link) => tracing::debug!("Privacy link for {}: {}", normalized, link),
            ResolutionResult::NotFound => tracing::debug!("No privacy link on {}", normalized),
            ResolutionResult::Failed(reason) => tracing::debug!("Check of {} failed: {}", normalized, reason),
        }
        result
    }
}

#[async_trait]
impl<F: Fetcher, P: DocumentParser> Resolve for LinkResolver<F, P> {
    async fn resolve(&self, url: &str) -> Result<ResolutionResult> {
        Ok(self.resolve_url(url).await)
    }
}
