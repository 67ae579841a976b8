use std::cmp::Ordering;

use roundup_common::Post;

use crate::scheduler::{Resolution, ResolvedAccount, SkipReason};
use crate::window::TimeWindow;

/// Posts that survived the window filter, plus what happened to each account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionResult {
    pub window: TimeWindow,
    /// Roster order, then per-account fetch order.
    pub posts: Vec<Post>,
    /// Accounts with at least one fetch attempt.
    pub accounts_attempted: usize,
    /// Skipped accounts with their reasons, in roster order.
    pub skipped: Vec<(String, SkipReason)>,
}

impl CollectionResult {
    pub fn total_collected(&self) -> usize {
        self.posts.len()
    }

    pub fn accounts_skipped(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Reorder posts with a caller-supplied comparator. The sort is stable.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Post, &Post) -> Ordering,
    {
        self.posts.sort_by(compare);
    }

    /// Most engaging first (likes + shares); ties keep collection order.
    pub fn sort_by_engagement(&mut self) {
        self.sort_by(|a, b| b.engagement().cmp(&a.engagement()));
    }
}

/// Keep only posts inside the window, preserving order.
pub fn filter_window<'p, I>(window: &TimeWindow, posts: I) -> Vec<Post>
where
    I: IntoIterator<Item = &'p Post>,
{
    posts
        .into_iter()
        .filter(|p| window.admits(p.created_at))
        .cloned()
        .collect()
}

/// Fold resolved accounts into the run's dataset.
pub fn aggregate(window: &TimeWindow, resolved: &[ResolvedAccount]) -> CollectionResult {
    let mut posts = Vec::new();
    let mut skipped = Vec::new();

    for account in resolved {
        match &account.resolution {
            Resolution::Posts(fetched) => posts.extend(filter_window(window, fetched)),
            Resolution::Skipped(reason) => skipped.push((account.handle.clone(), reason.clone())),
        }
    }

    CollectionResult {
        window: *window,
        posts,
        accounts_attempted: resolved.iter().filter(|a| a.attempts > 0).count(),
        skipped,
    }
}
