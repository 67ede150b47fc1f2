//! Weighted SEO rubric.
//!
//! Categories are evaluated in a fixed order; recommendations are collected
//! in that same order and truncated, so the output is stable for identical
//! inputs.

use crate::domain::models::{
    CategoryScore, PageSignals, PerformanceScores, RubricCategory, ScoreBreakdown, TechnicalFlags,
};

pub const MAX_SCORE: u32 = 100;
pub const MAX_RECOMMENDATIONS: usize = 8;

pub const TITLE_LENGTH: std::ops::RangeInclusive<usize> = 30..=60;
pub const DESCRIPTION_LENGTH: std::ops::RangeInclusive<usize> = 120..=160;

pub const EXCELLENT_MESSAGE: &str = "Excellent! Your website follows SEO best practices.";

const VIEWPORT_POINTS: u32 = 5;
const CHARSET_POINTS: u32 = 5;
const ROBOTS_POINTS: u32 = 3;
const SITEMAP_POINTS: u32 = 2;

/// Collects points and messages for one category at a time.
struct Tally {
    categories: Vec<CategoryScore>,
    recommendations: Vec<String>,
}

impl Tally {
    fn new() -> Self {
        Self {
            categories: Vec::with_capacity(8),
            recommendations: Vec::new(),
        }
    }

    fn record(&mut self, category: RubricCategory, points: u32, messages: Vec<String>) {
        self.categories.push(CategoryScore {
            category,
            points,
            max_points: category.max_points(),
        });
        self.recommendations.extend(messages);
    }

    fn finish(self) -> ScoreBreakdown {
        let total: u32 = self.categories.iter().map(|c| c.points).sum();
        let seo_score = total.min(MAX_SCORE) as u8;

        let mut recommendations = self.recommendations;
        if recommendations.is_empty() {
            recommendations.push(EXCELLENT_MESSAGE.to_string());
        }
        recommendations.truncate(MAX_RECOMMENDATIONS);

        ScoreBreakdown {
            seo_score,
            recommendations,
            categories: self.categories,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        signals: &PageSignals,
        performance: &PerformanceScores,
        technical: &TechnicalFlags,
    ) -> ScoreBreakdown {
        let mut tally = Tally::new();

        let (points, messages) = score_title(&signals.title);
        tally.record(RubricCategory::Title, points, messages);

        let (points, messages) = score_description(&signals.description);
        tally.record(RubricCategory::Description, points, messages);

        let (points, messages) = score_headings(signals.headings.h1);
        tally.record(RubricCategory::Headings, points, messages);

        let (points, messages) = score_images(signals);
        tally.record(RubricCategory::Images, points, messages);

        let (points, messages) = score_links(signals);
        tally.record(RubricCategory::Links, points, messages);

        let (points, messages) = score_open_graph(signals.open_graph.present_count());
        tally.record(RubricCategory::OpenGraph, points, messages);

        let (points, messages) = score_technical(signals, technical);
        tally.record(RubricCategory::Technical, points, messages);

        let (points, messages) = score_performance(performance);
        tally.record(RubricCategory::Performance, points, messages);

        let breakdown = tally.finish();
        log::debug!(
            "[SCORE] score={} recommendations={}",
            breakdown.seo_score,
            breakdown.recommendations.len()
        );
        breakdown
    }
}

fn score_title(title: &str) -> (u32, Vec<String>) {
    let len = title.chars().count();
    match len {
        0 => (
            0,
            vec!["Missing title tag. Add a descriptive title between 30 and 60 characters.".into()],
        ),
        n if TITLE_LENGTH.contains(&n) => (20, vec![]),
        n if n < *TITLE_LENGTH.start() => (
            10,
            vec![format!(
                "Title is too short ({n} characters). Expand it to 30-60 characters with your main keyword."
            )],
        ),
        n => (
            10,
            vec![format!(
                "Title is too long ({n} characters). Shorten it to 30-60 characters so it is not truncated in search results."
            )],
        ),
    }
}

fn score_description(description: &str) -> (u32, Vec<String>) {
    let len = description.chars().count();
    match len {
        0 => (
            0,
            vec!["Missing meta description. Add a compelling summary between 120 and 160 characters.".into()],
        ),
        n if DESCRIPTION_LENGTH.contains(&n) => (15, vec![]),
        n if n < *DESCRIPTION_LENGTH.start() => (
            8,
            vec![format!(
                "Meta description is too short ({n} characters). Expand it to 120-160 characters."
            )],
        ),
        n => (
            8,
            vec![format!(
                "Meta description is too long ({n} characters). Shorten it to 120-160 characters to avoid truncation."
            )],
        ),
    }
}

fn score_headings(h1_count: usize) -> (u32, Vec<String>) {
    match h1_count {
        1 => (15, vec![]),
        0 => (
            0,
            vec!["Missing H1 tag. Add a single H1 heading that describes the page topic.".into()],
        ),
        n => (
            5,
            vec![format!(
                "Multiple H1 tags found ({n}). Use exactly one H1 per page for a clear structure."
            )],
        ),
    }
}

fn score_images(signals: &PageSignals) -> (u32, Vec<String>) {
    let images = &signals.images;
    let Some(coverage) = images.alt_coverage() else {
        return (0, vec![]);
    };

    if images.without_alt == 0 {
        return (10, vec![]);
    }

    let points = if coverage >= 80.0 { 7 } else { 3 };
    (
        points,
        vec![format!(
            "{} of {} images are missing alt text. Add descriptive alt attributes for accessibility and image search.",
            images.without_alt,
            images.sampled()
        )],
    )
}

fn score_links(signals: &PageSignals) -> (u32, Vec<String>) {
    if signals.links.has_links() {
        (10, vec![])
    } else {
        (
            0,
            vec!["No links found. Add internal links to help users and search engines navigate your site.".into()],
        )
    }
}

fn score_open_graph(present: u32) -> (u32, Vec<String>) {
    let points = 10 * present / 4;
    if present < 4 {
        (
            points,
            vec![format!(
                "Incomplete OpenGraph tags ({present}/4). Add og:title, og:description, og:image and og:url for better social sharing."
            )],
        )
    } else {
        (points, vec![])
    }
}

fn score_technical(signals: &PageSignals, technical: &TechnicalFlags) -> (u32, Vec<String>) {
    let checks = [
        (
            signals.technical.viewport,
            VIEWPORT_POINTS,
            "Missing viewport meta tag. Add one to make the page mobile-friendly.",
        ),
        (
            signals.technical.charset,
            CHARSET_POINTS,
            "Missing charset declaration. Add <meta charset=\"utf-8\"> to the document head.",
        ),
        (
            technical.has_robots_txt,
            ROBOTS_POINTS,
            "Missing robots.txt file. Add one to guide search engine crawlers.",
        ),
        (
            technical.has_sitemap,
            SITEMAP_POINTS,
            "Missing sitemap.xml. Add a sitemap to help search engines discover your pages.",
        ),
    ];

    checks
        .iter()
        .fold((0, Vec::new()), |(points, mut messages), (present, weight, message)| {
            if *present {
                (points + weight, messages)
            } else {
                messages.push(message.to_string());
                (points, messages)
            }
        })
}

fn score_performance(performance: &PerformanceScores) -> (u32, Vec<String>) {
    let Some(average) = performance.average() else {
        return (0, vec![]);
    };
    // Floored so the shown value never reaches a tier the score missed.
    let shown = average.floor();

    if average >= 90.0 {
        (15, vec![])
    } else if average >= 70.0 {
        (
            10,
            vec![format!(
                "Page performance could be improved (average score {shown:.0}). Optimize images and reduce render-blocking resources."
            )],
        )
    } else {
        (
            5,
            vec![format!(
                "Poor page performance (average score {shown:.0}). Prioritize page speed: compress assets, enable caching and defer scripts."
            )],
        )
    }
}
