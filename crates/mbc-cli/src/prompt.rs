//! Interactive prompts for the registration form.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use mbc_core::models::{MembershipType, Registration};

/// Prompt for one line of input, trimmed
pub fn line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

fn required(label: &str) -> Result<String> {
    loop {
        let value = line(label)?;
        if !value.is_empty() {
            return Ok(value);
        }
        eprintln!("  This field is required.");
    }
}

fn optional(label: &str) -> Result<Option<String>> {
    let value = line(label)?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

fn membership_type() -> Result<MembershipType> {
    loop {
        let value = line("Membership type (single / family / principle family): ")?;
        match MembershipType::parse(&value) {
            Some(kind) => return Ok(kind),
            None => eprintln!("  Choose single, family or principle family."),
        }
    }
}

fn yes(label: &str) -> Result<bool> {
    let value = line(label)?;
    Ok(matches!(value.to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Walk the member through the join-the-club form
pub fn registration() -> Result<Registration> {
    println!("Mountain Backpackers Club membership application");
    println!("Optional fields can be left blank.\n");

    let member_title = required("Title: ")?;
    let first_name = required("First name: ")?;
    let last_name = required("Last name: ")?;
    let email = required("Email: ")?;
    let username = required("Username: ")?;
    let password = rpassword::prompt_password("Password: ")?;
    let confirm_password = rpassword::prompt_password("Confirm password: ")?;
    let address_line_one = required("Address line 1: ")?;
    let address_line_two = optional("Address line 2: ")?;
    let address_line_three = optional("Address line 3: ")?;
    let postal_code = required("Postal code: ")?;
    let residential_area = optional("Residential area: ")?;
    let preferred_contact_number = required("Preferred contact number: ")?;
    let membership_type = membership_type()?;
    let id_passport_number = optional("ID / passport number: ")?;
    let next_of_kin = required("Next of kin: ")?;
    let next_of_kin_contact = required("Next of kin contact number: ")?;
    let next_of_kin_address = required("Next of kin address: ")?;
    let medical_issues = optional("Medical issues / allergies: ")?;
    let medical_aid = optional("Medical aid: ")?;
    let medical_aid_number = optional("Medical aid number: ")?;
    let agree_to_code_of_conduct = yes("Do you agree to the club's code of conduct? [y/N] ")?;

    Ok(Registration {
        member_title,
        first_name,
        last_name,
        email,
        username,
        password,
        confirm_password,
        address_line_one,
        address_line_two,
        address_line_three,
        postal_code,
        residential_area,
        preferred_contact_number,
        membership_type,
        id_passport_number,
        next_of_kin,
        next_of_kin_contact,
        next_of_kin_address,
        medical_issues,
        medical_aid,
        medical_aid_number,
        agree_to_code_of_conduct,
    })
}
