//! Login, logout and protected pages

mod common;

use common::{create_test_server, extract_csrf_token, login, open_form, session_cookie, with_session};

#[tokio::test]
async fn test_login_renews_session_token() {
    let (server, _users) = create_test_server();
    let (anonymous, csrf) = open_form(&server, "/user/login").await;

    let response = server
        .post("/user/login")
        .add_cookie(with_session(&anonymous))
        .form(&[
            ("email", "alice@example.com"),
            ("password", "pa$$word"),
            ("csrf_token", csrf.as_str()),
        ])
        .await;

    assert_eq!(response.status_code(), 303);
    assert_eq!(response.headers()["location"], "/snippet/create");
    let authenticated = session_cookie(&response);
    assert_ne!(authenticated, anonymous);

    // The pre-login token no longer identifies a session
    let response = server
        .get("/snippet/create")
        .add_cookie(with_session(&anonymous))
        .await;
    assert_eq!(response.status_code(), 303);

    // The CSRF token carries over to the renewed session
    let response = server
        .get("/snippet/create")
        .add_cookie(with_session(&authenticated))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(extract_csrf_token(&response.text()), csrf);
}

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let (server, _users) = create_test_server();
    let (token, csrf) = open_form(&server, "/user/login").await;

    let response = server
        .post("/user/login")
        .add_cookie(with_session(&token))
        .form(&[
            ("email", "alice@example.com"),
            ("password", "wrong password"),
            ("csrf_token", csrf.as_str()),
        ])
        .await;

    assert_eq!(response.status_code(), 422);
    let body = response.text();
    assert!(body.contains("Email or password is incorrect"));
    assert!(body.contains(r#"value="alice@example.com""#));
}

#[tokio::test]
async fn test_login_with_invalid_fields() {
    let (server, _users) = create_test_server();
    let (token, csrf) = open_form(&server, "/user/login").await;

    let response = server
        .post("/user/login")
        .add_cookie(with_session(&token))
        .form(&[
            ("email", "not-an-email"),
            ("password", ""),
            ("csrf_token", csrf.as_str()),
        ])
        .await;

    assert_eq!(response.status_code(), 422);
    let body = response.text();
    assert!(body.contains("This field must be a valid email address"));
    assert!(body.contains("This field cannot be blank"));
    assert!(!body.contains("Email or password is incorrect"));
}

#[tokio::test]
async fn test_protected_pages_redirect_anonymous_users() {
    let (server, _users) = create_test_server();

    let response = server.get("/snippet/create").await;

    assert_eq!(response.status_code(), 303);
    assert_eq!(response.headers()["location"], "/user/login");
}

#[tokio::test]
async fn test_protected_pages_are_not_cached() {
    let (server, _users) = create_test_server();
    let token = login(&server).await;

    let response = server
        .get("/snippet/create")
        .add_cookie(with_session(&token))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.headers()["cache-control"], "no-store");
    let body = response.text();
    assert!(body.contains(r#"<form action="/snippet/create" method="POST">"#));
    assert!(body.contains("Logout"));
    assert!(!body.contains(r#"<a href="/user/login">Login</a>"#));
}

#[tokio::test]
async fn test_create_snippet() {
    let (server, _users) = create_test_server();
    let token = login(&server).await;
    let (_, csrf) = open_form_with(&server, "/snippet/create", &token).await;

    let response = server
        .post("/snippet/create")
        .add_cookie(with_session(&token))
        .form(&[
            ("title", "O snail"),
            ("content", "O snail\nClimb Mount Fuji,\nBut slowly, slowly!"),
            ("expires", "7"),
            ("csrf_token", csrf.as_str()),
        ])
        .await;

    assert_eq!(response.status_code(), 303);
    assert_eq!(response.headers()["location"], "/snippet/view/2");

    let response = server
        .get("/snippet/view/1")
        .add_cookie(with_session(&token))
        .await;
    assert!(response.text().contains("Snippet successfully created!"));
}

#[tokio::test]
async fn test_create_snippet_validation() {
    struct Case {
        name: &'static str,
        title: String,
        content: &'static str,
        expires: &'static str,
        want_code: u16,
        want_message: &'static str,
    }

    let cases = [
        Case {
            name: "Blank title",
            title: "   ".to_string(),
            content: "content",
            expires: "365",
            want_code: 422,
            want_message: "This field cannot be blank",
        },
        Case {
            name: "Long title",
            title: "a".repeat(101),
            content: "content",
            expires: "365",
            want_code: 422,
            want_message: "This field cannot be more than 100 characters long",
        },
        Case {
            name: "Blank content",
            title: "title".to_string(),
            content: "",
            expires: "1",
            want_code: 422,
            want_message: "This field cannot be blank",
        },
        Case {
            name: "Unsupported expiry",
            title: "title".to_string(),
            content: "content",
            expires: "30",
            want_code: 422,
            want_message: "This field must equal 1, 7 or 365",
        },
        Case {
            name: "Non-numeric expiry",
            title: "title".to_string(),
            content: "content",
            expires: "soon",
            want_code: 400,
            want_message: "Bad Request",
        },
    ];

    let (server, _users) = create_test_server();
    let token = login(&server).await;
    let (_, csrf) = open_form_with(&server, "/snippet/create", &token).await;

    for case in cases {
        let response = server
            .post("/snippet/create")
            .add_cookie(with_session(&token))
            .form(&[
                ("title", case.title.as_str()),
                ("content", case.content),
                ("expires", case.expires),
                ("csrf_token", csrf.as_str()),
            ])
            .await;

        assert_eq!(response.status_code(), case.want_code, "{}", case.name);
        assert!(response.text().contains(case.want_message), "{}", case.name);
    }
}

#[tokio::test]
async fn test_logout() {
    let (server, _users) = create_test_server();
    let token = login(&server).await;
    let (_, csrf) = open_form_with(&server, "/snippet/create", &token).await;

    let response = server
        .post("/user/logout")
        .add_cookie(with_session(&token))
        .form(&[("csrf_token", csrf.as_str())])
        .await;

    assert_eq!(response.status_code(), 303);
    assert_eq!(response.headers()["location"], "/");
    let renewed = session_cookie(&response);
    assert_ne!(renewed, token);

    let response = server.get("/").add_cookie(with_session(&renewed)).await;
    let body = response.text();
    assert!(body.contains("You've been logged out successfully!"));
    assert!(body.contains(r#"<a href="/user/login">Login</a>"#));

    // Neither the old nor the new token is authenticated any more
    for t in [&token, &renewed] {
        let response = server
            .get("/snippet/create")
            .add_cookie(with_session(t))
            .await;
        assert_eq!(response.status_code(), 303);
    }
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let (server, _users) = create_test_server();
    let (token, csrf) = open_form(&server, "/user/login").await;

    let response = server
        .post("/user/logout")
        .add_cookie(with_session(&token))
        .form(&[("csrf_token", csrf.as_str())])
        .await;

    assert_eq!(response.status_code(), 303);
    assert_eq!(response.headers()["location"], "/user/login");
}

async fn open_form_with(
    server: &axum_test::TestServer,
    path: &str,
    token: &str,
) -> (String, String) {
    let response = server.get(path).add_cookie(with_session(token)).await;
    assert_eq!(response.status_code(), 200);
    (token.to_string(), extract_csrf_token(&response.text()))
}
