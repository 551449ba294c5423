//! Database-facing row and parameter types. Distinct from the quadlist-types
//! API models to keep the storage layer independent of the wire shapes.

use quadlist_types::models::Category;

/// Registration fields persisted to the users table. The password hash is
/// passed separately so this struct never carries credentials.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub major: Option<String>,
    pub graduation_year: Option<i64>,
    pub campus: Option<String>,
}

/// Minimal user row for credential checks and session issuance.
#[derive(Debug)]
pub struct UserAuthRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug)]
pub struct ProfileRow {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub major: Option<String>,
    pub graduation_year: Option<i64>,
    pub campus: Option<String>,
    pub bio: Option<String>,
    pub preferred_contact: Option<String>,
    pub notifications: bool,
    pub messages: bool,
}

/// Whole-record profile replacement. Every field is written on update.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub major: Option<String>,
    pub graduation_year: Option<i64>,
    pub campus: Option<String>,
    pub bio: Option<String>,
    pub preferred_contact: Option<String>,
    pub notifications: bool,
    pub messages: bool,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Option<f64>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListingUpdate {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Option<f64>,
}

/// Owner display fields joined into public listing rows.
#[derive(Debug)]
pub struct ListingOwner {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug)]
pub struct ListingRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Option<f64>,
    pub status: String,
    pub images: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub owner: Option<ListingOwner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    DateAsc,
    #[default]
    DateDesc,
}

impl SortKey {
    /// Unknown sort values fall back to newest-first, matching the public
    /// feed's default.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            Some("price_asc") => SortKey::PriceAsc,
            Some("price_desc") => SortKey::PriceDesc,
            Some("date_asc") => SortKey::DateAsc,
            _ => SortKey::DateDesc,
        }
    }
}

#[derive(Debug, Default)]
pub struct ListingFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub sort: SortKey,
}
