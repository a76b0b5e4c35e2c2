// src/assemble.rs
//! Report assembly: merge per-category enriched results into one write-once
//! `Report`. The shape (merged vs sectioned) is a per-run configuration
//! choice. Within one assembled output a URL appears at most once;
//! first-seen wins and later duplicates are dropped silently.

use std::collections::HashSet;

use chrono::Utc;

use crate::types::{EnrichedItem, Report, ReportBody};

/// Cross-category cap for the merged shape.
pub const DEFAULT_MAX_ITEMS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// One global list, re-ranked by score across categories, capped.
    Merged { max_items: usize },
    /// Categories stay as named sections in their own order.
    Sectioned,
}

pub struct ReportAssembler {
    mode: AssemblyMode,
}

impl ReportAssembler {
    pub fn new(mode: AssemblyMode) -> Self {
        Self { mode }
    }

    pub fn merged() -> Self {
        Self::new(AssemblyMode::Merged {
            max_items: DEFAULT_MAX_ITEMS,
        })
    }

    pub fn sectioned() -> Self {
        Self::new(AssemblyMode::Sectioned)
    }

    /// `category_results` in category order; item order within a category is
    /// the selector's ranking.
    pub fn assemble(&self, category_results: Vec<(String, Vec<EnrichedItem>)>) -> Report {
        let generated_at = Utc::now();
        let title = format!(
            "Finance & AI Scout Daily Report: {}",
            generated_at.format("%Y-%m-%d")
        );

        let mut seen = HashSet::new();
        let body = match self.mode {
            AssemblyMode::Merged { max_items } => {
                let mut items: Vec<EnrichedItem> = category_results
                    .into_iter()
                    .flat_map(|(_, v)| v)
                    .filter(|it| seen.insert(it.url.clone()))
                    .collect();
                // Stable sort: first-seen order survives among equal scores.
                items.sort_by(|a, b| b.score.cmp(&a.score));
                items.truncate(max_items);
                ReportBody::Merged(items)
            }
            AssemblyMode::Sectioned => {
                let sections = category_results
                    .into_iter()
                    .map(|(name, v)| {
                        let kept: Vec<EnrichedItem> = v
                            .into_iter()
                            .filter(|it| seen.insert(it.url.clone()))
                            .collect();
                        (name, kept)
                    })
                    .filter(|(_, v)| !v.is_empty())
                    .collect();
                ReportBody::Sectioned(sections)
            }
        };

        Report {
            title,
            generated_at,
            body,
        }
    }
}
