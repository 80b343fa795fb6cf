//! Keyed, deduplicated projection of the posts table.
//!
//! DESIGN
//! ======
//! Posts reach the client three ways: full refetch, the confirmed row from
//! the client's own insert, and realtime change notifications. The same row
//! routinely arrives by two of them (an insert echoed back over realtime), so
//! the list is an ordered map keyed by post id: order lives in a deque of ids,
//! rows live in a map. At any time the list holds at most one entry per id.

#[cfg(test)]
#[path = "feed_list_test.rs"]
mod feed_list_test;

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::model::{Post, PostId, Profile};
use crate::realtime::ChangeEvent;

/// Result of applying one change to the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The change could not be applied locally; reload from the store.
    NeedsRefetch,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedList {
    order: VecDeque<PostId>,
    posts: HashMap<PostId, Post>,
    /// Last profile seen per author, used to decorate realtime rows.
    authors: HashMap<Uuid, Profile>,
}

impl FeedList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from fetched rows, newest first. Later duplicates of an id are
    /// dropped.
    #[must_use]
    pub fn from_posts(posts: Vec<Post>) -> Self {
        let mut list = Self::new();
        list.replace_all(posts);
        list
    }

    /// Replace the contents with a fresh fetch, sorted by `created_at`
    /// descending. Known author profiles are kept.
    pub fn replace_all(&mut self, mut posts: Vec<Post>) {
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.order.clear();
        self.posts.clear();
        let mut seen = HashSet::new();
        for post in posts {
            if !seen.insert(post.id.clone()) {
                continue;
            }
            self.remember_author(&post);
            self.order.push_back(post.id.clone());
            self.posts.insert(post.id.clone(), post);
        }
    }

    /// Put `post` at the front. An existing entry with the same id is
    /// replaced rather than duplicated.
    pub fn prepend(&mut self, post: Post) {
        let previous = self.remove(&post.id);
        let post = self.decorate(post, previous.as_ref());
        self.remember_author(&post);
        self.order.push_front(post.id.clone());
        self.posts.insert(post.id.clone(), post);
    }

    /// Replace the entry with `post.id` in place. Returns `false` (and
    /// leaves the list untouched) when no such entry exists.
    pub fn replace(&mut self, post: Post) -> bool {
        let Some(previous) = self.posts.get(&post.id) else {
            return false;
        };
        let post = self.decorate(post, Some(previous));
        self.remember_author(&post);
        self.posts.insert(post.id.clone(), post);
        true
    }

    /// Remove the entry with `id`.
    pub fn remove(&mut self, id: &PostId) -> Option<Post> {
        let removed = self.posts.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(removed)
    }

    /// Apply one realtime change.
    pub fn apply(&mut self, change: &ChangeEvent) -> ApplyOutcome {
        match change {
            ChangeEvent::Insert(post) => self.prepend(post.clone()),
            ChangeEvent::Update(post) => {
                self.replace(post.clone());
            }
            ChangeEvent::Delete(id) => {
                self.remove(id);
            }
            ChangeEvent::Unrecognized(_) => return ApplyOutcome::NeedsRefetch,
        }
        ApplyOutcome::Applied
    }

    /// Remember `profile` so later rows by the same author display it.
    pub fn learn_author(&mut self, profile: Profile) {
        self.authors.insert(profile.id, profile);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &PostId) -> bool {
        self.posts.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    /// Posts in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.order.iter().filter_map(|id| self.posts.get(id))
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Post> {
        self.iter().cloned().collect()
    }

    fn decorate(&self, mut post: Post, previous: Option<&Post>) -> Post {
        if post.profile.is_none() {
            post.profile = previous
                .and_then(|p| p.profile.clone())
                .or_else(|| self.authors.get(&post.user_id).cloned());
        }
        post
    }

    fn remember_author(&mut self, post: &Post) {
        if let Some(profile) = &post.profile {
            self.authors.insert(post.user_id, profile.clone());
        }
    }
}
