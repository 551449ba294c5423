use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of listing categories. Stored as text, validated here so no
/// free-form category ever reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Job,
    Books,
    Furniture,
    Technology,
    Services,
    Miscellaneous,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Job => "Job",
            Category::Books => "Books",
            Category::Furniture => "Furniture",
            Category::Technology => "Technology",
            Category::Services => "Services",
            Category::Miscellaneous => "Miscellaneous",
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Job" => Ok(Category::Job),
            "Books" => Ok(Category::Books),
            "Furniture" => Ok(Category::Furniture),
            "Technology" => Ok(Category::Technology),
            "Services" => Ok(Category::Services),
            "Miscellaneous" => Ok(Category::Miscellaneous),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing lifecycle state. `inactive` is accepted on input as an alias for
/// `sold`; the stored value is always one of the two canonical strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid listing status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for ListingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "sold" | "inactive" => Ok(ListingStatus::Sold),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing-scoped message between two users. Modeled for the schema; no
/// delivery or notification logic exists server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub listing_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub message: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip() {
        for name in ["Job", "Books", "Furniture", "Technology", "Services", "Miscellaneous"] {
            let cat: Category = name.parse().unwrap();
            assert_eq!(cat.as_str(), name);
        }
        assert!("Vehicles".parse::<Category>().is_err());
        assert!("books".parse::<Category>().is_err()); // case matters
    }

    #[test]
    fn status_accepts_inactive_alias() {
        assert_eq!("sold".parse::<ListingStatus>().unwrap(), ListingStatus::Sold);
        assert_eq!("inactive".parse::<ListingStatus>().unwrap(), ListingStatus::Sold);
        assert_eq!("active".parse::<ListingStatus>().unwrap(), ListingStatus::Active);
        assert!("archived".parse::<ListingStatus>().is_err());
    }
}
