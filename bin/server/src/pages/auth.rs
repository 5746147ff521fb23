//! Login and sign-up forms.

use leptos::prelude::*;
use tandem_access::Notice;

use super::{Shell, render};

#[component]
fn CredentialFields(
    action: &'static str,
    submit: &'static str,
    email: String,
    error: Option<String>,
) -> impl IntoView {
    view! {
        {error.map(|message| view! { <p class="error" role="alert">{message}</p> })}
        <form method="post" action=action>
            <label>
                "Email "
                <input type="email" name="email" value=email required=true autocomplete="email"/>
            </label>
            <label>
                "Password "
                <input type="password" name="password" required=true/>
            </label>
            <button type="submit">{submit}</button>
        </form>
    }
}

#[component]
fn LoginPage(email: String, error: Option<String>, notices: Vec<Notice>) -> impl IntoView {
    view! {
        <Shell title="Sign in" notices>
            <h1>"Welcome back"</h1>
            <CredentialFields action="/auth/signin" submit="Sign in" email error/>
            <p>"No account yet? " <a href="/signup">"Create one"</a></p>
        </Shell>
    }
}

#[component]
fn SignupPage(email: String, error: Option<String>, notices: Vec<Notice>) -> impl IntoView {
    view! {
        <Shell title="Create account" notices>
            <h1>"Create your account"</h1>
            <CredentialFields action="/auth/signup" submit="Create account" email error/>
            <p>"Already have an account? " <a href="/login">"Sign in"</a></p>
        </Shell>
    }
}

/// Login page. `email` pre-fills the form after a failed attempt.
#[must_use]
pub fn login(email: &str, error: Option<&str>, notices: &[Notice]) -> String {
    let email = email.to_string();
    let error = error.map(str::to_string);
    let notices = notices.to_vec();
    render(move || view! { <LoginPage email error notices/> })
}

/// Account creation page.
#[must_use]
pub fn signup(email: &str, error: Option<&str>, notices: &[Notice]) -> String {
    let email = email.to_string();
    let error = error.map(str::to_string);
    let notices = notices.to_vec();
    render(move || view! { <SignupPage email error notices/> })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_shows_error_and_keeps_email() {
        let page = login("a@x.com", Some("Incorrect password."), &[]);
        assert!(page.contains(r#"role="alert""#));
        assert!(page.contains("Incorrect password."));
        assert!(page.contains(r#"value="a@x.com""#));
        assert!(page.contains(r#"action="/auth/signin""#));
        assert!(page.contains(r#"href="/signup""#));
    }

    #[test]
    fn signup_without_error_has_no_alert() {
        let page = signup("", None, &[]);
        assert!(!page.contains(r#"role="alert""#));
        assert!(page.contains(r#"action="/auth/signup""#));
        assert!(page.contains("Create your account"));
    }

    #[test]
    fn prefilled_email_is_escaped() {
        let page = login(r#""><script>"#, None, &[]);
        assert!(!page.contains(r#""><script>"#));
    }

    #[test]
    fn login_carries_queued_notices() {
        let page = login("", None, &[Notice::warning("Signed out.")]);
        assert!(page.contains(r#"class="notice warning""#));
        assert!(page.contains("Signed out."));
    }
}
