//! Transactional email bodies.

use chrono::{Datelike, Utc};

use super::OutgoingEmail;

const BRAND: &str = "#2563eb";

pub fn verification(to: &str, name: Option<&str>, app_url: &str, token: &str) -> OutgoingEmail {
    let url = format!("{}/verify-email?token={}", app_url, token);
    let body = format!(
        r#"<h2 style="margin-top: 0;">Verify your email address</h2>
<p>{greeting}</p>
<p>Thanks for signing up for GigIt! Please verify your email address by clicking the button below:</p>
{button}
<p style="font-size: 14px; color: #666;">Or copy and paste this link into your browser:</p>
<p style="font-size: 14px; color: {BRAND}; word-break: break-all;">{url}</p>
<p style="font-size: 14px; color: #666; margin-top: 20px;">This link will expire in 24 hours.</p>"#,
        greeting = greeting(name),
        button = button(&url, "Verify Email"),
        url = escape(&url),
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your GigIt email".to_string(),
        html: layout(&body, Some("If you didn't create an account with GigIt, you can safely ignore this email.")),
    }
}

pub fn password_reset(to: &str, name: Option<&str>, app_url: &str, token: &str) -> OutgoingEmail {
    let url = format!("{}/reset-password?token={}", app_url, token);
    let body = format!(
        r#"<h2 style="margin-top: 0;">Reset your password</h2>
<p>{greeting}</p>
<p>We received a request to reset your password. Click the button below to create a new password:</p>
{button}
<p style="font-size: 14px; color: #666;">Or copy and paste this link into your browser:</p>
<p style="font-size: 14px; color: {BRAND}; word-break: break-all;">{url}</p>
<p style="font-size: 14px; color: #666; margin-top: 20px;">This link will expire in 1 hour.</p>"#,
        greeting = greeting(name),
        button = button(&url, "Reset Password"),
        url = escape(&url),
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your GigIt password".to_string(),
        html: layout(
            &body,
            Some("If you didn't request a password reset, you can safely ignore this email. Your password will not be changed."),
        ),
    }
}

pub fn welcome(to: &str, name: Option<&str>, app_url: &str) -> OutgoingEmail {
    let body = format!(
        r#"<h2 style="margin-top: 0;">Welcome to GigIt!</h2>
<p>{greeting}</p>
<p>Your email has been verified and your account is now active. You're all set to start using GigIt!</p>
{button}"#,
        greeting = greeting(name),
        button = button(&format!("{}/login", app_url), "Go to GigIt"),
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: "Welcome to GigIt!".to_string(),
        html: layout(&body, None),
    }
}

fn greeting(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hi {},", escape(name)),
        None => "Hi,".to_string(),
    }
}

fn button(url: &str, label: &str) -> String {
    format!(
        r#"<div style="text-align: center; margin: 30px 0;">
<a href="{}" style="display: inline-block; background-color: {BRAND}; color: white; padding: 12px 30px; text-decoration: none; border-radius: 6px; font-weight: 600;">{}</a>
</div>"#,
        escape(url),
        label
    )
}

fn layout(body: &str, disclaimer: Option<&str>) -> String {
    let disclaimer = disclaimer.map(|d| format!("<p>{}</p>", d)).unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
<div style="text-align: center; margin-bottom: 30px;"><h1 style="color: {BRAND}; margin: 0;">GigIt</h1></div>
<div style="background-color: #f9fafb; border-radius: 8px; padding: 30px; margin-bottom: 20px;">
{body}
</div>
<div style="text-align: center; font-size: 12px; color: #999;">
{disclaimer}
<p>&copy; {year} GigIt. All rights reserved.</p>
</div>
</body>
</html>"#,
        year = Utc::now().year(),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
