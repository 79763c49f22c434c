//! Minimal inline HTML pages. No template engine: the skeleton renders three
//! small pages (login form, signed-in summary, error).

use crate::error::AppError;
use crate::identity::Principal;

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title} - gatehouse</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

pub fn login_page() -> String {
    shell(
        "Sign in",
        "<h1>Sign in</h1>\n\
         <form method=\"post\" action=\"/Login/Index\">\n\
           <label>User name <input type=\"text\" name=\"UserName\"></label>\n\
           <label>Email <input type=\"email\" name=\"Email\" required></label>\n\
           <button type=\"submit\">Sign in</button>\n\
         </form>",
    )
}

pub fn home_page(principal: &Principal) -> String {
    let roles = principal
        .roles
        .iter()
        .map(|r| format!("<li>{}</li>", escape_html(r)))
        .collect::<Vec<_>>()
        .join("\n");
    let body = format!(
        "<h1>Welcome, {name}</h1>\n\
         <p>Signed in as {email}</p>\n\
         <ul>{roles}</ul>\n\
         <form method=\"post\" action=\"/Login/Logout\">\n\
           <button type=\"submit\">Sign out</button>\n\
         </form>",
        name = escape_html(&principal.name),
        email = escape_html(&principal.email),
        roles = roles,
    );
    shell("Home", &body)
}

pub fn error_page_generic() -> String {
    shell(
        "Error",
        "<h1>Something went wrong</h1>\n<p>An error occurred while processing your request.</p>",
    )
}

pub fn error_page_detailed(err: &AppError) -> String {
    let body = format!(
        "<h1>Error</h1>\n<p><code>{}</code>: {}</p>",
        escape_html(err.code_str()),
        escape_html(err.message()),
    );
    shell("Error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_escape_principal_values() {
        let p = Principal::from_claims(Some("<bob>"), "a@b.com", vec!["Admin".into()]);
        let html = home_page(&p);
        assert!(html.contains("&lt;bob&gt;"));
        assert!(!html.contains("<bob>"));
        assert!(html.contains("a@b.com"));
    }

    #[test]
    fn login_page_posts_to_login_index() {
        let html = login_page();
        assert!(html.contains("action=\"/Login/Index\""));
        assert!(html.contains("name=\"Email\""));
        assert!(html.contains("name=\"UserName\""));
    }
}
