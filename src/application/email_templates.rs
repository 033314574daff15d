use url::Url;

const BRAND_NAME: &str = "JobMatch";

fn origin_label(app_origin: &str) -> String {
    Url::parse(app_origin)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()))
        .unwrap_or_else(|| app_origin.to_string())
}

pub fn primary_button(url: &str, label: &str) -> String {
    format!(
        r#"<a href="{url}" style="display:inline-block;padding:12px 18px;background-color:#111827;color:#ffffff;text-decoration:none;border-radius:8px;font-weight:600;">{label}</a>"#
    )
}

/// Renders the sign-in email. Returns (subject, html, text); the plain-text
/// part is kept so clients that strip HTML still get a working link.
pub fn magic_link_email(app_origin: &str, link: &str, ttl_minutes: i64) -> (String, String, String) {
    let origin = origin_label(app_origin);

    let subject = format!("Sign in to {}", BRAND_NAME);
    let headline = "Your sign-in link is ready";
    let lead = format!(
        "Use this secure link to finish signing in. It expires in {} minutes.",
        ttl_minutes
    );
    let reason = format!("you requested to sign in to {}", origin);
    let footer_note =
        "This one-time link keeps your account protected; delete this email if you did not request it.";

    let button = primary_button(link, "Sign in");
    let body = format!(
        "{button}<p style=\"margin:12px 0 0;font-size:14px;color:#4b5563;\">If the button does not work, copy and paste this URL:<br><span style=\"word-break:break-all;color:#111827;\">{link}</span></p>"
    );

    let html = wrap_email(app_origin, headline, &lead, &body, &reason, Some(footer_note));

    let text = format!(
        "Sign in to {brand}\n\n\
         Use this secure link to finish signing in:\n\n\
         {link}\n\n\
         The link expires in {ttl_minutes} minutes and can be used once.\n\
         If you didn't request it, you can safely ignore this email.\n",
        brand = BRAND_NAME,
    );

    (subject, html, text)
}

pub fn wrap_email(
    app_origin: &str,
    headline: &str,
    lead: &str,
    body_html: &str,
    reason: &str,
    footer_note: Option<&str>,
) -> String {
    let origin = origin_label(app_origin);
    let reason_label = "Why you got this email";
    let ignore_line = "If you didn't request this, you can safely ignore it.";
    let sent_by = "Sent by";

    let footer_note = footer_note
        .map(|note| {
            format!(
                r#"<p style="margin:8px 0 0;color:#4b5563;font-size:13px;">{}</p>"#,
                note
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <body style="background:#f8fafc;margin:0;padding:24px;font-family:Arial,Helvetica,sans-serif;">
    <div style="max-width:560px;margin:0 auto;background:#ffffff;border:1px solid #e5e7eb;border-radius:12px;padding:24px;box-shadow:0 8px 30px rgba(0,0,0,0.04);">
      <div style="font-size:12px;letter-spacing:0.08em;text-transform:uppercase;color:#6b7280;">{brand} - {origin}</div>
      <h1 style="margin:12px 0 8px;font-size:22px;color:#111827;">{headline}</h1>
      <p style="margin:0 0 12px;font-size:15px;color:#111827;line-height:1.6;">{lead}</p>
      {body_html}
      <div style="margin-top:20px;padding-top:16px;border-top:1px solid #e5e7eb;">
        <p style="margin:0 0 6px;font-size:13px;color:#4b5563;">{reason_label}: {reason}.</p>
        <p style="margin:0;font-size:13px;color:#4b5563;">{ignore_line}</p>
        {footer_note}
      </div>
      <p style="margin:14px 0 4px;font-size:12px;color:#9ca3af;">{sent_by} {brand} - {origin}</p>
    </div>
  </body>
</html>
"#,
        brand = BRAND_NAME,
        origin = origin,
        headline = headline,
        lead = lead,
        body_html = body_html,
        reason = reason,
        reason_label = reason_label,
        ignore_line = ignore_line,
        sent_by = sent_by,
        footer_note = footer_note,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_link_email_embeds_link_in_both_parts() {
        let link = "https://app.jobmatch.test/auth/magic?token=abc123";
        let (subject, html, text) = magic_link_email("https://app.jobmatch.test", link, 15);

        assert!(subject.contains("Sign in"));
        assert!(html.contains(link));
        assert!(text.contains(link));
        assert!(html.contains("expires in 15 minutes"));
        assert!(text.contains("15 minutes"));
    }

    #[test]
    fn origin_label_falls_back_to_raw_value() {
        assert_eq!(origin_label("https://app.jobmatch.test"), "app.jobmatch.test");
        assert_eq!(origin_label("not a url"), "not a url");
    }
}
