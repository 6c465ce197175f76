use serde::{Deserialize, Serialize};

/// CMS collection envelope: `{"data":[{"id":..,"attributes":{..}}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<Entity<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity<T> {
    pub id: Option<i64>,
    pub attributes: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationItemAttributes {
    #[serde(rename = "Displayname")]
    pub display_name: String,
    #[serde(rename = "Link", default)]
    pub link: String,
    #[serde(rename = "navigation_subitems")]
    pub subitems: Option<Collection<NavigationSubitemAttributes>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationSubitemAttributes {
    #[serde(rename = "Displayname")]
    pub display_name: String,
    #[serde(rename = "Link", default)]
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageAttributes {
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationLink {
    pub display_name: String,
    pub link: String,
}

/// A top-level menu entry. Entries with subitems open a submenu instead
/// of linking directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationItem {
    pub display_name: String,
    pub link: String,
    #[serde(default)]
    pub subitems: Vec<NavigationLink>,
}

impl NavigationItem {
    pub fn has_submenu(&self) -> bool {
        !self.subitems.is_empty()
    }
}

impl From<NavigationItemAttributes> for NavigationItem {
    fn from(attrs: NavigationItemAttributes) -> Self {
        let subitems = attrs
            .subitems
            .map(|c| c.data)
            .unwrap_or_default()
            .into_iter()
            .map(|e| NavigationLink {
                display_name: e.attributes.display_name,
                link: e.attributes.link,
            })
            .collect();
        Self {
            display_name: attrs.display_name,
            link: attrs.link,
            subitems,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: Option<i64>,
    pub link: String,
    pub title: Option<String>,
    /// CMS-authored HTML
    pub content: String,
}

impl From<Entity<PageAttributes>> for Page {
    fn from(entity: Entity<PageAttributes>) -> Self {
        Self {
            id: entity.id,
            link: entity.attributes.link,
            title: entity.attributes.title,
            content: entity.attributes.content,
        }
    }
}

/// Page link for a slug: the home page is `/`, others `/<slug>`.
pub fn page_link(slug: &str) -> String {
    format!("/{}", slug.trim_matches('/'))
}
