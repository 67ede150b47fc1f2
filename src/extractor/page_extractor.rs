use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

use crate::domain::models::{
    HeadingCounts, ImageStats, LinkStats, OpenGraphTags, PageSignals, TechnicalTags,
    TwitterCardTags,
};

/// Default number of `<img>` elements inspected for alt text.
pub const DEFAULT_IMAGE_SAMPLE_CAP: usize = 20;
/// Default number of `<a href>` elements classified.
pub const DEFAULT_LINK_SAMPLE_CAP: usize = 50;
/// Upper bound for the missing-alt and broken-link sample lists.
pub const SAMPLE_LIST_LIMIT: usize = 5;

const IMAGE_WITHOUT_SRC: &str = "(image without src)";

fn cached(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector must parse"))
}

fn exists(html: &Html, cell: &'static OnceLock<Selector>, css: &str) -> bool {
    html.select(cached(cell, css)).next().is_some()
}

/// Turns fetched markup into a `PageSignals` value.
///
/// Extraction is a pure function of `(html, base_url)`: no I/O, no clock,
/// and element selection follows document order, so identical inputs always
/// yield identical signals. Image and link inspection is bounded by the
/// sample caps; headings are counted in full.
#[derive(Debug, Clone, Copy)]
pub struct PageExtractor {
    image_sample_cap: usize,
    link_sample_cap: usize,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SAMPLE_CAP, DEFAULT_LINK_SAMPLE_CAP)
    }
}

impl PageExtractor {
    pub fn new(image_sample_cap: usize, link_sample_cap: usize) -> Self {
        Self {
            image_sample_cap,
            link_sample_cap,
        }
    }

    pub fn extract(&self, html: &str, base_url: &Url) -> PageSignals {
        let document = Html::parse_document(html);

        let signals = PageSignals {
            title: Self::extract_title(&document),
            description: Self::extract_meta_description(&document),
            headings: Self::extract_headings(&document),
            images: self.extract_images(&document),
            links: self.extract_links(&document, base_url),
            open_graph: Self::extract_open_graph(&document),
            twitter_card: Self::extract_twitter_card(&document),
            technical: Self::extract_technical(&document),
        };

        log::debug!(
            "[EXTRACT] {}: title={} chars, h1={}, images={}/{}, links={}+{} (broken {})",
            base_url,
            signals.title.chars().count(),
            signals.headings.h1,
            signals.images.with_alt,
            signals.images.total,
            signals.links.internal,
            signals.links.external,
            signals.links.broken
        );

        signals
    }

    pub fn extract_title(html: &Html) -> String {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        html.select(cached(&SELECTOR, "title"))
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    pub fn extract_meta_description(html: &Html) -> String {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        html.select(cached(&SELECTOR, "meta[name='description']"))
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    pub fn extract_headings(html: &Html) -> HeadingCounts {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = cached(&SELECTOR, "h1, h2, h3, h4, h5, h6");

        html.select(selector)
            .filter_map(|element| {
                element
                    .value()
                    .name()
                    .trim_start_matches('h')
                    .parse::<u8>()
                    .ok()
            })
            .fold(HeadingCounts::default(), |mut counts, level| {
                counts.record(level);
                counts
            })
    }

    fn extract_images(&self, html: &Html) -> ImageStats {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = cached(&SELECTOR, "img");

        let mut stats = ImageStats {
            total: html.select(selector).count(),
            ..Default::default()
        };

        for img in html.select(selector).take(self.image_sample_cap) {
            if has_alt_text(&img) {
                stats.with_alt += 1;
                continue;
            }

            stats.without_alt += 1;
            if stats.missing_alt_samples.len() < SAMPLE_LIST_LIMIT {
                let src = img
                    .value()
                    .attr("src")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(IMAGE_WITHOUT_SRC);
                stats.missing_alt_samples.push(src.to_string());
            }
        }

        stats
    }

    fn extract_links(&self, html: &Html, base_url: &Url) -> LinkStats {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = cached(&SELECTOR, "a[href]");
        let base_host = base_url.host_str();

        let mut stats = LinkStats::default();

        for element in html.select(selector).take(self.link_sample_cap) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };

            match base_url.join(href) {
                Ok(resolved) if resolved.host_str() == base_host => stats.internal += 1,
                Ok(_) => stats.external += 1,
                Err(e) => {
                    log::trace!("[EXTRACT] Malformed link {:?}: {}", href, e);
                    stats.broken += 1;
                    if stats.broken_samples.len() < SAMPLE_LIST_LIMIT {
                        stats.broken_samples.push(href.to_string());
                    }
                }
            }
        }

        stats
    }

    pub fn extract_open_graph(html: &Html) -> OpenGraphTags {
        static TITLE: OnceLock<Selector> = OnceLock::new();
        static DESCRIPTION: OnceLock<Selector> = OnceLock::new();
        static IMAGE: OnceLock<Selector> = OnceLock::new();
        static URL: OnceLock<Selector> = OnceLock::new();

        OpenGraphTags {
            has_title: exists(html, &TITLE, "meta[property='og:title']"),
            has_description: exists(html, &DESCRIPTION, "meta[property='og:description']"),
            has_image: exists(html, &IMAGE, "meta[property='og:image']"),
            has_url: exists(html, &URL, "meta[property='og:url']"),
        }
    }

    pub fn extract_twitter_card(html: &Html) -> TwitterCardTags {
        static CARD: OnceLock<Selector> = OnceLock::new();
        static TITLE: OnceLock<Selector> = OnceLock::new();
        static DESCRIPTION: OnceLock<Selector> = OnceLock::new();
        static IMAGE: OnceLock<Selector> = OnceLock::new();

        TwitterCardTags {
            has_card_type: exists(html, &CARD, "meta[name='twitter:card']"),
            has_title: exists(html, &TITLE, "meta[name='twitter:title']"),
            has_description: exists(html, &DESCRIPTION, "meta[name='twitter:description']"),
            has_image: exists(html, &IMAGE, "meta[name='twitter:image']"),
        }
    }

    pub fn extract_technical(html: &Html) -> TechnicalTags {
        static VIEWPORT: OnceLock<Selector> = OnceLock::new();
        static CHARSET: OnceLock<Selector> = OnceLock::new();

        TechnicalTags {
            viewport: exists(html, &VIEWPORT, "meta[name='viewport']"),
            charset: exists(html, &CHARSET, "meta[charset]"),
        }
    }
}

fn has_alt_text(img: &ElementRef<'_>) -> bool {
    img.value()
        .attr("alt")
        .map(|alt| !alt.trim().is_empty())
        .unwrap_or(false)
}
