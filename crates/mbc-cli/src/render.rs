//! Plain-text rendering for member and content views.

use std::fmt::Write;

use anyhow::Result;

use mbc_core::models::{Member, NavigationItem, Page};
use mbc_core::utils::{format_optional, html_to_text, truncate_string, yes_no};
use mbc_core::Portal;

/// Width of the label column in profile output
const LABEL_WIDTH: usize = 28;

/// Longest page title shown in the header line
const MAX_TITLE_LENGTH: usize = 60;

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {:<width$}{}", label, value, width = LABEL_WIDTH);
}

pub fn profile(member: &Member) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", member.display_name());
    if let Some(role) = member.role_name() {
        let _ = writeln!(out, "  ({})", role);
    }
    out.push('\n');

    let na = "N/A";
    field(&mut out, "Username", &member.username);
    field(&mut out, "Email", &member.email);
    field(&mut out, "Title", &format_optional(&member.member_title, na));
    field(&mut out, "First name", &format_optional(&member.first_name, na));
    field(&mut out, "Last name", &format_optional(&member.last_name, na));
    field(&mut out, "Address line 1", &format_optional(&member.address_line_one, na));
    field(&mut out, "Address line 2", &format_optional(&member.address_line_two, na));
    field(&mut out, "Address line 3", &format_optional(&member.address_line_three, na));
    field(&mut out, "Residential area", &format_optional(&member.residential_area, na));
    field(&mut out, "Postal code", &format_optional(&member.postal_code, na));
    field(&mut out, "Contact number", &format_optional(&member.preferred_contact_number, na));
    field(&mut out, "Membership type", &format_optional(&member.membership_type, na));
    field(&mut out, "ID / passport number", &format_optional(&member.id_passport_number, na));
    field(&mut out, "Next of kin", &format_optional(&member.next_of_kin, na));
    field(&mut out, "Next of kin contact", &format_optional(&member.next_of_kin_contact, na));
    field(&mut out, "Next of kin address", &format_optional(&member.next_of_kin_address, na));
    field(&mut out, "Medical issues", &format_optional(&member.medical_issues, na));
    field(&mut out, "Medical aid", &format_optional(&member.medical_aid, na));
    field(&mut out, "Medical aid number", &format_optional(&member.medical_aid_number, na));
    field(&mut out, "Interested in day hikes", yes_no(member.interested_in_day_hikes));
    field(&mut out, "Interested in backpacking", yes_no(member.interested_in_backpacking));
    out
}

/// The site menu followed by the member menu, which depends on sign-in state
pub fn navigation(items: &[NavigationItem], authenticated: bool) -> String {
    let mut out = String::new();
    for item in items {
        if item.has_submenu() {
            let _ = writeln!(out, "{}", item.display_name);
            for sub in &item.subitems {
                let _ = writeln!(out, "  {:<24}{}", sub.display_name, sub.link);
            }
        } else {
            let _ = writeln!(out, "{:<26}{}", item.display_name, item.link);
        }
    }

    let _ = writeln!(out, "Member");
    if authenticated {
        let _ = writeln!(out, "  {:<24}{}", "Profile", "mbc profile");
        let _ = writeln!(out, "  {:<24}{}", "Logout", "mbc logout");
    } else {
        let _ = writeln!(out, "  {:<24}{}", "Authenticate", "mbc login");
        let _ = writeln!(out, "  {:<24}{}", "Join", "/join-the-club");
    }
    out
}

pub fn page(page: &Page) -> String {
    let mut out = String::new();
    if let Some(ref title) = page.title {
        let _ = writeln!(out, "{}\n", truncate_string(title, MAX_TITLE_LENGTH));
    }
    let _ = writeln!(out, "{}", html_to_text(&page.content));
    out
}

pub fn status(portal: &Portal) -> Result<String> {
    let mut out = String::new();
    let state = if portal.is_authenticated() { "signed in" } else { "signed out" };
    let _ = writeln!(out, "Session:      {}", state);
    let _ = writeln!(out, "Backend:      {}", portal.config().api_url());
    let _ = writeln!(out, "Storage:      {}", portal.config().session_dir()?.display());
    if let Some(ref username) = portal.config().last_username {
        let _ = writeln!(out, "Last member:  {}", username);
    }
    Ok(out)
}
