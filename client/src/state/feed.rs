//! Feed page state.
//!
//! DESIGN
//! ======
//! Plain data mutated through `RwSignal::update`. Each async action is split
//! into a synchronous `begin_*` that decides whether the action runs and a
//! `finish_*` that applies its result, so the browser's single thread never
//! observes a half-applied action.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use domain::{ApplyOutcome, ChangeEvent, FeedError, FeedList, Post};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedState {
    pub posts: FeedList,
    pub loading: bool,
    pub submitting: bool,
    pub error: Option<String>,
    /// Composer text.
    pub draft: String,
}

impl FeedState {
    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// Apply a fetch result. Failures keep the current list and show the
    /// reload prompt.
    pub fn finish_fetch(&mut self, result: Result<Vec<Post>, FeedError>) {
        self.loading = false;
        match result {
            Ok(posts) => {
                self.posts.replace_all(posts);
                self.error = None;
            }
            Err(failure) => self.error = failure.user_message(),
        }
    }

    /// Claim the submit slot for `content`. Returns the trimmed text to
    /// insert, or `None` when the content is blank or a submission is
    /// already in flight.
    pub fn begin_submit(&mut self, content: &str) -> Option<String> {
        let content = content.trim();
        if content.is_empty() || self.submitting {
            return None;
        }
        self.submitting = true;
        Some(content.to_owned())
    }

    /// Apply a submit result. Success prepends the stored row and clears
    /// the draft when it was the draft being submitted.
    pub fn finish_submit(&mut self, submitted: &str, result: Result<Post, FeedError>) {
        self.submitting = false;
        match result {
            Ok(post) => {
                if self.draft.trim() == submitted {
                    self.draft.clear();
                }
                self.posts.prepend(post);
                self.error = None;
            }
            Err(failure) => self.error = failure.user_message(),
        }
    }

    pub fn apply(&mut self, change: &ChangeEvent) -> ApplyOutcome {
        self.posts.apply(change)
    }

    /// The sample-post button shows only on a loaded, empty feed.
    #[must_use]
    pub fn offers_sample_post(&self) -> bool {
        !self.loading && self.posts.is_empty()
    }

    #[must_use]
    pub fn can_post(&self) -> bool {
        !self.submitting && !self.draft.trim().is_empty()
    }
}
