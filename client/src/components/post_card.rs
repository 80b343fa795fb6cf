//! One post in the feed list.

use domain::Post;
use leptos::prelude::*;

#[component]
pub fn PostCard(post: Post) -> impl IntoView {
    let author = post.author_label();
    let created = post.created_label();

    view! {
        <article class="post-card">
            <header class="post-card__meta">
                <span class="post-card__author">{author}</span>
                <time class="post-card__time">{created}</time>
            </header>
            <p class="post-card__content">{post.content}</p>
        </article>
    }
}
