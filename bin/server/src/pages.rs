//! Server-rendered pages.
//!
//! Pages are Leptos components rendered to HTML strings on the server; no
//! client bundle is shipped.

pub mod auth;
pub mod home;

pub use auth::{login, signup};
pub use home::{home, profile};

use leptos::prelude::*;
use leptos::tachys::view::RenderHtml;
use tandem_access::{Notice, NoticeLevel};

/// Renders a view to a complete HTML document.
fn render<V: IntoView>(view: impl FnOnce() -> V) -> String {
    Owner::new().with(|| view().to_html())
}

/// Queued notices, shown as toasts above the page.
#[component]
fn NoticeList(notices: Vec<Notice>) -> impl IntoView {
    view! {
        <div class="notices">
            {notices
                .into_iter()
                .map(|notice| {
                    let class = match notice.level {
                        NoticeLevel::Info => "notice info",
                        NoticeLevel::Warning => "notice warning",
                    };
                    view! { <div class=class role="status">{notice.message}</div> }
                })
                .collect_view()}
        </div>
    }
}

/// Shared document shell.
#[component]
fn Shell(#[prop(into)] title: String, notices: Vec<Notice>, children: Children) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <title>{format!("{title} · Tandem")}</title>
            </head>
            <body>
                <NoticeList notices/>
                <main>{children()}</main>
            </body>
        </html>
    }
}

/// Refreshes itself until the guard has an answer.
#[component]
fn LoadingPage() -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta http-equiv="refresh" content="1"/>
                <title>"Tandem"</title>
            </head>
            <body>
                <main aria-busy="true">
                    <p class="spinner">"Loading…"</p>
                </main>
            </body>
        </html>
    }
}

#[component]
fn ErrorPage(message: String, back: String) -> impl IntoView {
    view! {
        <Shell title="Something went wrong" notices=Vec::new()>
            <h1>"Something went wrong"</h1>
            <p class="error">{message}</p>
            <p><a href=back>"Go back"</a></p>
        </Shell>
    }
}

/// Placeholder shown while a client's session is still being resolved.
#[must_use]
pub fn loading() -> String {
    render(|| view! { <LoadingPage/> })
}

/// Standalone error page.
#[must_use]
pub fn error(message: &str, back: &str) -> String {
    let message = message.to_string();
    let back = back.to_string();
    render(move || view! { <ErrorPage message back/> })
}
