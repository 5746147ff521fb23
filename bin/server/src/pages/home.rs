//! Protected pages.

use leptos::prelude::*;
use tandem_access::{Identity, Notice};

use super::{Shell, render};

/// Sections of the journal linked from the home page.
const SECTIONS: [(&str, &str); 7] = [
    ("Letters", "/letters"),
    ("Chat", "/chat"),
    ("Movies", "/movies"),
    ("To-dos", "/todos"),
    ("Music", "/music"),
    ("Calendar", "/calendar"),
    ("Gallery", "/gallery"),
];

#[component]
fn SignOutButton() -> impl IntoView {
    view! {
        <form method="post" action="/auth/signout">
            <button type="submit">"Sign out"</button>
        </form>
    }
}

#[component]
fn HomePage(identity: Identity, notices: Vec<Notice>) -> impl IntoView {
    let greeting = format!("Hello, {}", identity.display_label());
    view! {
        <Shell title="Home" notices>
            <header>
                <h1>{greeting}</h1>
                <a href="/profile">"Profile"</a>
                <SignOutButton/>
            </header>
            <nav>
                <ul class="sections">
                    {SECTIONS
                        .into_iter()
                        .map(|(name, href)| view! { <li><a href=href>{name}</a></li> })
                        .collect_view()}
                </ul>
            </nav>
        </Shell>
    }
}

#[component]
fn ProfileRow(label: &'static str, value: Option<String>) -> impl IntoView {
    view! {
        <dt>{label}</dt>
        <dd>{value.unwrap_or_else(|| "Not set".to_string())}</dd>
    }
}

#[component]
fn ProfilePage(identity: Identity, notices: Vec<Notice>) -> impl IntoView {
    let avatar = identity.avatar_url().map(str::to_string);
    let name = identity.display_name().map(str::to_string);
    let email = identity.email().map(str::to_string);
    view! {
        <Shell title="Profile" notices>
            <h1>"Profile"</h1>
            {avatar.map(|src| view! { <img class="avatar" src=src alt=""/> })}
            <dl>
                <ProfileRow label="Name" value=name/>
                <ProfileRow label="Email" value=email/>
            </dl>
            <p><a href="/">"Back home"</a></p>
            <SignOutButton/>
        </Shell>
    }
}

#[must_use]
pub fn home(identity: &Identity, notices: &[Notice]) -> String {
    let identity = identity.clone();
    let notices = notices.to_vec();
    render(move || view! { <HomePage identity notices/> })
}

#[must_use]
pub fn profile(identity: &Identity, notices: &[Notice]) -> String {
    let identity = identity.clone();
    let notices = notices.to_vec();
    render(move || view! { <ProfilePage identity notices/> })
}
