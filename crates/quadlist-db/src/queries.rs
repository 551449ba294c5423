use anyhow::anyhow;

use quadlist_types::models::ListingStatus;

use crate::Database;
use crate::gateway::{DbResult, Row, Value};
use crate::models::{
    ListingFilter, ListingOwner, ListingRow, ListingUpdate, NewListing, NewUser, ProfileRow,
    ProfileUpdate, SortKey, UserAuthRow,
};

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser, password_hash: &str) -> DbResult<i64> {
        let row = self
            .query_row(
                "INSERT INTO users (email, password, first_name, last_name, phone, major, graduation_year, campus)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 RETURNING id",
                &[
                    user.email.as_str().into(),
                    password_hash.into(),
                    user.first_name.as_str().into(),
                    user.last_name.as_str().into(),
                    user.phone.clone().into(),
                    user.major.clone().into(),
                    user.graduation_year.into(),
                    user.campus.clone().into(),
                ],
            )?
            .ok_or_else(|| anyhow!("INSERT returned no row"))?;
        row.get_i64(0)
    }

    pub fn email_exists(&self, email: &str) -> DbResult<bool> {
        Ok(self
            .query_row("SELECT 1 FROM users WHERE email = ?", &[email.into()])?
            .is_some())
    }

    pub fn user_auth_by_email(&self, email: &str) -> DbResult<Option<UserAuthRow>> {
        let row = self.query_row(
            "SELECT id, email, password, first_name, last_name FROM users WHERE email = ?",
            &[email.into()],
        )?;
        row.map(|r| {
            Ok(UserAuthRow {
                id: r.get_i64(0)?,
                email: r.get_str(1)?,
                password: r.get_str(2)?,
                first_name: r.get_str(3)?,
                last_name: r.get_str(4)?,
            })
        })
        .transpose()
    }

    // -- Email verifications --

    pub fn create_verification(&self, user_id: i64, code: &str) -> DbResult<()> {
        self.execute(
            "INSERT INTO email_verifications (user_id, verification_code) VALUES (?, ?)",
            &[user_id.into(), code.into()],
        )?;
        Ok(())
    }

    pub fn has_verified_email(&self, user_id: i64) -> DbResult<bool> {
        Ok(self
            .query_row(
                "SELECT 1 FROM email_verifications WHERE user_id = ? AND verified = 1 LIMIT 1",
                &[user_id.into()],
            )?
            .is_some())
    }

    /// Consume a pending verification token. Returns the verified user's id,
    /// or None when no pending row matches — unknown token, wrong email
    /// pairing, and already-consumed token are indistinguishable by design.
    /// The flip is a conditioned UPDATE, so a replayed token can never
    /// consume twice.
    pub fn consume_verification(&self, email: &str, code: &str) -> DbResult<Option<i64>> {
        let pending = self.query_row(
            "SELECT ev.id, ev.user_id
             FROM email_verifications ev
             JOIN users u ON ev.user_id = u.id
             WHERE u.email = ? AND ev.verification_code = ? AND ev.verified = 0",
            &[email.into(), code.into()],
        )?;
        let Some(row) = pending else {
            return Ok(None);
        };
        let (verification_id, user_id) = (row.get_i64(0)?, row.get_i64(1)?);

        let affected = self.execute(
            "UPDATE email_verifications SET verified = 1 WHERE id = ? AND verified = 0",
            &[verification_id.into()],
        )?;
        Ok((affected == 1).then_some(user_id))
    }

    // -- Listings --

    pub fn create_listing(&self, owner_id: i64, listing: &NewListing) -> DbResult<i64> {
        let images = serde_json::to_string(&listing.images)
            .map_err(|e| anyhow!("serializing attachment list: {}", e))?;
        let row = self
            .query_row(
                "INSERT INTO listings (user_id, title, description, category, price, images)
                 VALUES (?, ?, ?, ?, ?, ?)
                 RETURNING id",
                &[
                    owner_id.into(),
                    listing.title.as_str().into(),
                    listing.description.as_str().into(),
                    listing.category.as_str().into(),
                    listing.price.into(),
                    images.into(),
                ],
            )?
            .ok_or_else(|| anyhow!("INSERT returned no row"))?;
        row.get_i64(0)
    }

    /// Public feed: active listings only, owner display fields joined in,
    /// conjunctive category/search filters, whitelisted sort.
    pub fn listings(&self, filter: &ListingFilter) -> DbResult<Vec<ListingRow>> {
        let mut sql = String::from(
            "SELECT l.id, l.user_id, l.title, l.description, l.category, l.price, l.status,
                    l.images, l.created_at, l.updated_at, u.first_name, u.last_name, u.email
             FROM listings l
             JOIN users u ON l.user_id = u.id
             WHERE l.status = 'active'",
        );
        let mut params: Vec<Value> = Vec::new();

        if let Some(category) = filter.category {
            sql.push_str(" AND l.category = ?");
            params.push(category.as_str().into());
        }
        if let Some(term) = &filter.search {
            sql.push_str(" AND (LOWER(l.title) LIKE LOWER(?) OR LOWER(l.description) LIKE LOWER(?))");
            let pattern = format!("%{}%", term);
            params.push(pattern.clone().into());
            params.push(pattern.into());
        }

        sql.push_str(match filter.sort {
            SortKey::PriceAsc => " ORDER BY l.price ASC",
            SortKey::PriceDesc => " ORDER BY l.price DESC",
            SortKey::DateAsc => " ORDER BY l.created_at ASC",
            SortKey::DateDesc => " ORDER BY l.created_at DESC",
        });

        self.query(&sql, &params)?
            .iter()
            .map(|r| listing_from_row(r, true))
            .collect()
    }

    /// Owner dashboard: every status, newest first.
    pub fn listings_by_owner(&self, owner_id: i64) -> DbResult<Vec<ListingRow>> {
        self.query(
            "SELECT id, user_id, title, description, category, price, status,
                    images, created_at, updated_at
             FROM listings
             WHERE user_id = ?
             ORDER BY created_at DESC",
            &[owner_id.into()],
        )?
        .iter()
        .map(|r| listing_from_row(r, false))
        .collect()
    }

    /// Ownership-scoped overwrite of the editable fields. Zero affected rows
    /// means the listing is absent or belongs to someone else; callers treat
    /// both identically.
    pub fn update_listing(
        &self,
        owner_id: i64,
        listing_id: i64,
        update: &ListingUpdate,
    ) -> DbResult<u64> {
        self.execute(
            "UPDATE listings
             SET title = ?, description = ?, category = ?, price = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND user_id = ?",
            &[
                update.title.as_str().into(),
                update.description.as_str().into(),
                update.category.as_str().into(),
                update.price.into(),
                listing_id.into(),
                owner_id.into(),
            ],
        )
    }

    pub fn set_listing_status(
        &self,
        owner_id: i64,
        listing_id: i64,
        status: ListingStatus,
    ) -> DbResult<u64> {
        self.execute(
            "UPDATE listings SET status = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND user_id = ?",
            &[status.as_str().into(), listing_id.into(), owner_id.into()],
        )
    }

    pub fn delete_listing(&self, owner_id: i64, listing_id: i64) -> DbResult<u64> {
        self.execute(
            "DELETE FROM listings WHERE id = ? AND user_id = ?",
            &[listing_id.into(), owner_id.into()],
        )
    }

    // -- Profiles --

    pub fn profile(&self, user_id: i64) -> DbResult<Option<ProfileRow>> {
        let row = self.query_row(
            "SELECT id, email, first_name, last_name, phone, major, graduation_year,
                    campus, bio, preferred_contact, notifications, messages
             FROM users WHERE id = ?",
            &[user_id.into()],
        )?;
        row.map(|r| {
            Ok(ProfileRow {
                id: r.get_i64(0)?,
                email: r.get_str(1)?,
                first_name: r.get_str(2)?,
                last_name: r.get_str(3)?,
                phone: r.get_opt_str(4)?,
                major: r.get_opt_str(5)?,
                graduation_year: r.get_opt_i64(6)?,
                campus: r.get_opt_str(7)?,
                bio: r.get_opt_str(8)?,
                preferred_contact: r.get_opt_str(9)?,
                notifications: r.get_bool(10)?,
                messages: r.get_bool(11)?,
            })
        })
        .transpose()
    }

    /// Whole-record replace: absent optional fields become NULL. Booleans are
    /// encoded 0/1 here and nowhere else.
    pub fn update_profile(&self, user_id: i64, profile: &ProfileUpdate) -> DbResult<u64> {
        self.execute(
            "UPDATE users
             SET first_name = ?, last_name = ?, phone = ?, major = ?, graduation_year = ?,
                 campus = ?, bio = ?, preferred_contact = ?, notifications = ?, messages = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            &[
                profile.first_name.as_str().into(),
                profile.last_name.as_str().into(),
                profile.phone.clone().into(),
                profile.major.clone().into(),
                profile.graduation_year.into(),
                profile.campus.clone().into(),
                profile.bio.clone().into(),
                profile.preferred_contact.clone().into(),
                profile.notifications.into(),
                profile.messages.into(),
                user_id.into(),
            ],
        )
    }
}

fn listing_from_row(row: &Row, with_owner: bool) -> DbResult<ListingRow> {
    let owner = if with_owner {
        Some(ListingOwner {
            first_name: row.get_str(10)?,
            last_name: row.get_str(11)?,
            email: row.get_str(12)?,
        })
    } else {
        None
    };
    Ok(ListingRow {
        id: row.get_i64(0)?,
        user_id: row.get_i64(1)?,
        title: row.get_str(2)?,
        description: row.get_str(3)?,
        category: row.get_str(4)?,
        price: row.get_opt_f64(5)?,
        status: row.get_str(6)?,
        images: decode_images(row.get_opt_str(7)?),
        created_at: row.get_str(8)?,
        updated_at: row.get_str(9)?,
        owner,
    })
}

/// Malformed or absent attachment storage yields an empty list, never an
/// error — a bad row must not take down the whole feed.
fn decode_images(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}
