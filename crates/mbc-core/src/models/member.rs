use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipType {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "family")]
    Family,
    #[serde(rename = "principleFamily")]
    PrincipleFamily,
}

impl MembershipType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Some(MembershipType::Single),
            "family" => Some(MembershipType::Family),
            "principlefamily" | "principle-family" | "principle family" => {
                Some(MembershipType::PrincipleFamily)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipType::Single => write!(f, "Single"),
            MembershipType::Family => write!(f, "Family"),
            MembershipType::PrincipleFamily => write!(f, "Principle family"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub role_type: Option<String>,
}

/// The member record served by `/users/me?populate=role`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub confirmed: Option<bool>,
    #[serde(default)]
    pub blocked: Option<bool>,
    #[serde(rename = "memberTitle", default)]
    pub member_title: Option<String>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(rename = "addressLineOne", default)]
    pub address_line_one: Option<String>,
    #[serde(rename = "addressLineTwo", default)]
    pub address_line_two: Option<String>,
    #[serde(rename = "addressLineThree", default)]
    pub address_line_three: Option<String>,
    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,
    #[serde(rename = "residentialArea", default)]
    pub residential_area: Option<String>,
    #[serde(rename = "preferredContactNumber", default)]
    pub preferred_contact_number: Option<String>,
    #[serde(rename = "membershipType", default)]
    pub membership_type: Option<String>,
    #[serde(rename = "idPassportNumber", default)]
    pub id_passport_number: Option<String>,
    #[serde(rename = "nextOfKin", default)]
    pub next_of_kin: Option<String>,
    #[serde(rename = "nextOfKinContact", default)]
    pub next_of_kin_contact: Option<String>,
    #[serde(rename = "nextOfKinAddress", default)]
    pub next_of_kin_address: Option<String>,
    #[serde(rename = "medicalIssues", default)]
    pub medical_issues: Option<String>,
    #[serde(rename = "medicalAid", default)]
    pub medical_aid: Option<String>,
    #[serde(rename = "medicalAidNumber", default)]
    pub medical_aid_number: Option<String>,
    #[serde(rename = "interestedInBackpacking", default)]
    pub interested_in_backpacking: Option<bool>,
    #[serde(rename = "interestedInDayHikes", default)]
    pub interested_in_day_hikes: Option<bool>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Member {
    /// "Title First Last", skipping whatever is missing; username as fallback.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [&self.member_title, &self.first_name, &self.last_name]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().and_then(|r| r.name.as_deref())
    }
}

/// Body of `PUT /users/:id`. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "memberTitle", skip_serializing_if = "Option::is_none")]
    pub member_title: Option<String>,
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "addressLineOne", skip_serializing_if = "Option::is_none")]
    pub address_line_one: Option<String>,
    #[serde(rename = "addressLineTwo", skip_serializing_if = "Option::is_none")]
    pub address_line_two: Option<String>,
    #[serde(rename = "addressLineThree", skip_serializing_if = "Option::is_none")]
    pub address_line_three: Option<String>,
    #[serde(rename = "postalCode", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(rename = "residentialArea", skip_serializing_if = "Option::is_none")]
    pub residential_area: Option<String>,
    #[serde(rename = "preferredContactNumber", skip_serializing_if = "Option::is_none")]
    pub preferred_contact_number: Option<String>,
    #[serde(rename = "membershipType", skip_serializing_if = "Option::is_none")]
    pub membership_type: Option<String>,
    #[serde(rename = "idPassportNumber", skip_serializing_if = "Option::is_none")]
    pub id_passport_number: Option<String>,
    #[serde(rename = "nextOfKin", skip_serializing_if = "Option::is_none")]
    pub next_of_kin: Option<String>,
    #[serde(rename = "nextOfKinContact", skip_serializing_if = "Option::is_none")]
    pub next_of_kin_contact: Option<String>,
    #[serde(rename = "nextOfKinAddress", skip_serializing_if = "Option::is_none")]
    pub next_of_kin_address: Option<String>,
    #[serde(rename = "medicalIssues", skip_serializing_if = "Option::is_none")]
    pub medical_issues: Option<String>,
    #[serde(rename = "medicalAid", skip_serializing_if = "Option::is_none")]
    pub medical_aid: Option<String>,
    #[serde(rename = "medicalAidNumber", skip_serializing_if = "Option::is_none")]
    pub medical_aid_number: Option<String>,
    #[serde(rename = "interestedInBackpacking", skip_serializing_if = "Option::is_none")]
    pub interested_in_backpacking: Option<bool>,
    #[serde(rename = "interestedInDayHikes", skip_serializing_if = "Option::is_none")]
    pub interested_in_day_hikes: Option<bool>,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        other => Err(format!("Expected yes or no, got {:?}", other)),
    }
}

impl ProfileUpdate {
    /// Set one field by its wire name (`postalCode`) or snake_case name
    /// (`postal_code`).
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), String> {
        let text = Some(value.to_string());
        match name {
            "username" => self.username = text,
            "email" => self.email = text,
            "password" => self.password = text,
            "memberTitle" | "member_title" => self.member_title = text,
            "firstName" | "first_name" => self.first_name = text,
            "lastName" | "last_name" => self.last_name = text,
            "addressLineOne" | "address_line_one" => self.address_line_one = text,
            "addressLineTwo" | "address_line_two" => self.address_line_two = text,
            "addressLineThree" | "address_line_three" => self.address_line_three = text,
            "postalCode" | "postal_code" => self.postal_code = text,
            "residentialArea" | "residential_area" => self.residential_area = text,
            "preferredContactNumber" | "preferred_contact_number" => {
                self.preferred_contact_number = text
            }
            "membershipType" | "membership_type" => {
                let kind = MembershipType::parse(value)
                    .ok_or_else(|| format!("Unknown membership type {:?}", value))?;
                self.membership_type = serde_json::to_value(kind)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string));
            }
            "idPassportNumber" | "id_passport_number" => self.id_passport_number = text,
            "nextOfKin" | "next_of_kin" => self.next_of_kin = text,
            "nextOfKinContact" | "next_of_kin_contact" => self.next_of_kin_contact = text,
            "nextOfKinAddress" | "next_of_kin_address" => self.next_of_kin_address = text,
            "medicalIssues" | "medical_issues" => self.medical_issues = text,
            "medicalAid" | "medical_aid" => self.medical_aid = text,
            "medicalAidNumber" | "medical_aid_number" => self.medical_aid_number = text,
            "interestedInBackpacking" | "interested_in_backpacking" => {
                self.interested_in_backpacking = Some(parse_flag(value)?)
            }
            "interestedInDayHikes" | "interested_in_day_hikes" => {
                self.interested_in_day_hikes = Some(parse_flag(value)?)
            }
            _ => return Err(format!("Unknown profile field {:?}", name)),
        }
        Ok(())
    }
}

/// Body of `POST /auth/local/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(rename = "memberTitle")]
    pub member_title: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    /// Checked locally, never sent
    #[serde(skip)]
    pub confirm_password: String,
    #[serde(rename = "addressLineOne")]
    pub address_line_one: String,
    #[serde(rename = "addressLineTwo")]
    pub address_line_two: Option<String>,
    #[serde(rename = "addressLineThree")]
    pub address_line_three: Option<String>,
    #[serde(rename = "postalCode")]
    pub postal_code: String,
    #[serde(rename = "residentialArea")]
    pub residential_area: Option<String>,
    #[serde(rename = "preferredContactNumber")]
    pub preferred_contact_number: String,
    #[serde(rename = "membershipType")]
    pub membership_type: MembershipType,
    #[serde(rename = "idPassportNumber")]
    pub id_passport_number: Option<String>,
    #[serde(rename = "nextOfKin")]
    pub next_of_kin: String,
    #[serde(rename = "nextOfKinContact")]
    pub next_of_kin_contact: String,
    #[serde(rename = "nextOfKinAddress")]
    pub next_of_kin_address: String,
    #[serde(rename = "medicalIssues")]
    pub medical_issues: Option<String>,
    #[serde(rename = "medicalAid")]
    pub medical_aid: Option<String>,
    #[serde(rename = "medicalAidNumber")]
    pub medical_aid_number: Option<String>,
    #[serde(rename = "agreeToCodeOfConduct")]
    pub agree_to_code_of_conduct: bool,
}

impl Registration {
    /// Pre-submit checks that need both password fields or the consent box.
    pub fn check(&self) -> Result<(), String> {
        if !self.agree_to_code_of_conduct {
            return Err("You must agree to the code of conduct.".to_string());
        }
        if self.password != self.confirm_password {
            return Err("The passwords do not match.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_registration() -> Registration {
    Registration {
        member_title: "Ms".to_string(),
        first_name: "Thandi".to_string(),
        last_name: "Mokoena".to_string(),
        email: "thandi@example.org".to_string(),
        username: "thandim".to_string(),
        password: "correct horse battery".to_string(),
        confirm_password: "correct horse battery".to_string(),
        address_line_one: "12 Summit Road".to_string(),
        address_line_two: None,
        address_line_three: None,
        postal_code: "2196".to_string(),
        residential_area: Some("Rosebank".to_string()),
        preferred_contact_number: "0821234567".to_string(),
        membership_type: MembershipType::Single,
        id_passport_number: None,
        next_of_kin: "Sipho Mokoena".to_string(),
        next_of_kin_contact: "0827654321".to_string(),
        next_of_kin_address: "12 Summit Road".to_string(),
        medical_issues: None,
        medical_aid: None,
        medical_aid_number: None,
        agree_to_code_of_conduct: true,
    }
}
