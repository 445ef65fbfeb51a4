//! Page layouts

use maud::{html, Markup, DOCTYPE};

use super::{human_date, FormData, TemplateData};
use crate::csrf::CSRF_FIELD;

fn csrf_input(data: &TemplateData) -> Markup {
    html! {
        input type="hidden" name=(CSRF_FIELD) value=(data.csrf_token);
    }
}

fn field_error(form: &FormData, key: &str) -> Markup {
    html! {
        @if let Some(message) = form.error(key) {
            label class="error" { (message) }
        }
    }
}

fn base(title: &str, data: &TemplateData, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) " - Snippetbox" }
                link rel="stylesheet" href="/static/css/main.css";
            }
            body {
                header {
                    h1 { a href="/" { "Snippetbox" } }
                }
                nav {
                    div {
                        a href="/" { "Home" }
                        @if data.is_authenticated {
                            a href="/snippet/create" { "Create snippet" }
                        }
                    }
                    div {
                        @if data.is_authenticated {
                            form action="/user/logout" method="POST" {
                                (csrf_input(data))
                                button { "Logout" }
                            }
                        } @else {
                            a href="/user/signup" { "Signup" }
                            a href="/user/login" { "Login" }
                        }
                    }
                }
                main {
                    @if let Some(flash) = &data.flash {
                        div class="flash" { (flash) }
                    }
                    (content)
                }
                footer {
                    "Powered by " a href="https://www.rust-lang.org/" { "Rust" } " in " (data.current_year)
                }
            }
        }
    }
}

pub(super) fn home(data: &TemplateData) -> Markup {
    base(
        "Home",
        data,
        html! {
            h2 { "Latest Snippets" }
            @if data.snippets.is_empty() {
                p { "There's nothing to see here... yet!" }
            } @else {
                table {
                    tr {
                        th { "Title" }
                        th { "Created" }
                        th { "ID" }
                    }
                    @for snippet in &data.snippets {
                        tr {
                            td { a href={ "/snippet/view/" (snippet.id.0) } { (snippet.title) } }
                            td { (human_date(snippet.created)) }
                            td { "#" (snippet.id.0) }
                        }
                    }
                }
            }
        },
    )
}

pub(super) fn view(data: &TemplateData) -> Markup {
    let title = data
        .snippet
        .as_ref()
        .map(|s| format!("Snippet #{}", s.id))
        .unwrap_or_else(|| "Snippet".to_string());

    base(
        &title,
        data,
        html! {
            @if let Some(snippet) = &data.snippet {
                div class="snippet" {
                    div class="metadata" {
                        strong { (snippet.title) }
                        span { "#" (snippet.id.0) }
                    }
                    pre { code { (snippet.content) } }
                    div class="metadata" {
                        time { "Created: " (human_date(snippet.created)) }
                        time { "Expires: " (human_date(snippet.expires)) }
                    }
                }
            }
        },
    )
}

pub(super) fn create(data: &TemplateData) -> Markup {
    let form = &data.form;
    base(
        "Create a New Snippet",
        data,
        html! {
            form action="/snippet/create" method="POST" {
                (csrf_input(data))
                div {
                    label { "Title:" }
                    (field_error(form, "title"))
                    input type="text" name="title" value=(form.value("title"));
                }
                div {
                    label { "Content:" }
                    (field_error(form, "content"))
                    textarea name="content" { (form.value("content")) }
                }
                div {
                    label { "Delete in:" }
                    (field_error(form, "expires"))
                    @for (days, label) in [("365", "One Year"), ("7", "One Week"), ("1", "One Day")] {
                        input type="radio" name="expires" value=(days) checked[form.value("expires") == days];
                        " " (label) " "
                    }
                }
                div {
                    input type="submit" value="Publish snippet";
                }
            }
        },
    )
}

pub(super) fn signup(data: &TemplateData) -> Markup {
    let form = &data.form;
    base(
        "Signup",
        data,
        html! {
            form action="/user/signup" method="POST" novalidate {
                (csrf_input(data))
                div {
                    label { "Name:" }
                    (field_error(form, "name"))
                    input type="text" name="name" value=(form.value("name"));
                }
                div {
                    label { "Email:" }
                    (field_error(form, "email"))
                    input type="email" name="email" value=(form.value("email"));
                }
                div {
                    label { "Password:" }
                    (field_error(form, "password"))
                    input type="password" name="password";
                }
                div {
                    input type="submit" value="Signup";
                }
            }
        },
    )
}

pub(super) fn login(data: &TemplateData) -> Markup {
    let form = &data.form;
    base(
        "Login",
        data,
        html! {
            form action="/user/login" method="POST" novalidate {
                (csrf_input(data))
                @for message in &form.validator.non_field_errors {
                    div class="error" { (message) }
                }
                div {
                    label { "Email:" }
                    (field_error(form, "email"))
                    input type="email" name="email" value=(form.value("email"));
                }
                div {
                    label { "Password:" }
                    (field_error(form, "password"))
                    input type="password" name="password";
                }
                div {
                    input type="submit" value="Login";
                }
            }
        },
    )
}
