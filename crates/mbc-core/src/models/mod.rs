//! Data models for club members and CMS content.
//!
//! - `Member`, `Role`: the signed-in member as returned by `/users/me`
//! - `ProfileUpdate`: editable member fields sent back on save
//! - `Registration`, `MembershipType`: the join-the-club form
//! - `NavigationItem`, `Page`: public site content

pub mod content;
pub mod member;

pub use content::{page_link, Collection, Entity, NavigationItem, NavigationLink, Page};
pub use member::{Member, MembershipType, ProfileUpdate, Registration, Role};
