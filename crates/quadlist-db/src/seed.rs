use tracing::info;

use crate::Database;
use crate::gateway::DbResult;

struct SeedUser {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    phone: &'static str,
    major: &'static str,
    graduation_year: i64,
    campus: &'static str,
    bio: &'static str,
}

struct SeedListing {
    owner_email: &'static str,
    title: &'static str,
    description: &'static str,
    category: &'static str,
    price: f64,
}

const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        email: "john.doe@asu.edu",
        first_name: "John",
        last_name: "Doe",
        phone: "(480) 555-0123",
        major: "Computer Science",
        graduation_year: 2025,
        campus: "Tempe",
        bio: "Computer Science student passionate about technology and innovation.",
    },
    SeedUser {
        email: "jane.smith@asu.edu",
        first_name: "Jane",
        last_name: "Smith",
        phone: "(480) 555-0124",
        major: "Business",
        graduation_year: 2024,
        campus: "Tempe",
        bio: "Business student looking for internship opportunities.",
    },
];

const SEED_LISTINGS: &[SeedListing] = &[
    SeedListing {
        owner_email: "john.doe@asu.edu",
        title: "Textbook: Calculus Early Transcendentals",
        description: "Barely used textbook for MAT 270. Great condition, no highlighting or writing.",
        category: "Books",
        price: 120.0,
    },
    SeedListing {
        owner_email: "john.doe@asu.edu",
        title: "MacBook Pro 13\" - Excellent Condition",
        description: "2019 MacBook Pro, barely used. Perfect for students. Includes original charger and box.",
        category: "Technology",
        price: 800.0,
    },
    SeedListing {
        owner_email: "jane.smith@asu.edu",
        title: "Roommate Needed - Vista del Sol",
        description: "Looking for a roommate to share a 2BR apartment near campus. $650/month including utilities.",
        category: "Miscellaneous",
        price: 650.0,
    },
    SeedListing {
        owner_email: "jane.smith@asu.edu",
        title: "Tutor Needed for Computer Science",
        description: "Need help with CSE 110 assignments. Flexible schedule, good pay.",
        category: "Services",
        price: 25.0,
    },
    SeedListing {
        owner_email: "john.doe@asu.edu",
        title: "Office Chair - Herman Miller",
        description: "Ergonomic office chair in excellent condition. Perfect for long study sessions.",
        category: "Furniture",
        price: 150.0,
    },
    SeedListing {
        owner_email: "jane.smith@asu.edu",
        title: "Part-time Research Assistant",
        description: "Looking for undergraduate research assistant for psychology study. $15/hour.",
        category: "Job",
        price: 15.0,
    },
];

impl Database {
    /// Insert the demo accounts and listings. Users seed idempotently via the
    /// unique email constraint; listings seed only into an empty table so
    /// repeated startups never duplicate them. All demo accounts share the
    /// supplied password hash and arrive pre-verified.
    pub fn seed_demo(&self, password_hash: &str) -> DbResult<()> {
        for user in SEED_USERS {
            self.execute(
                "INSERT INTO users (email, password, first_name, last_name, phone, major,
                                    graduation_year, campus, bio)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (email) DO NOTHING",
                &[
                    user.email.into(),
                    password_hash.into(),
                    user.first_name.into(),
                    user.last_name.into(),
                    user.phone.into(),
                    user.major.into(),
                    user.graduation_year.into(),
                    user.campus.into(),
                    user.bio.into(),
                ],
            )?;

            let Some(id) = self.seed_user_id(user.email)? else {
                continue;
            };
            if !self.has_verified_email(id)? {
                self.create_verification(id, "seeded")?;
                self.execute(
                    "UPDATE email_verifications SET verified = 1 WHERE user_id = ?",
                    &[id.into()],
                )?;
            }
        }

        let listing_count = self
            .query_row("SELECT COUNT(*) FROM listings", &[])?
            .map(|r| r.get_i64(0))
            .transpose()?
            .unwrap_or(0);
        if listing_count == 0 {
            for listing in SEED_LISTINGS {
                let Some(owner_id) = self.seed_user_id(listing.owner_email)? else {
                    continue;
                };
                self.execute(
                    "INSERT INTO listings (user_id, title, description, category, price, images)
                     VALUES (?, ?, ?, ?, ?, '[]')",
                    &[
                        owner_id.into(),
                        listing.title.into(),
                        listing.description.into(),
                        listing.category.into(),
                        listing.price.into(),
                    ],
                )?;
            }
        }

        info!("Demo data seeded ({} users, {} listings)", SEED_USERS.len(), SEED_LISTINGS.len());
        Ok(())
    }

    fn seed_user_id(&self, email: &str) -> DbResult<Option<i64>> {
        self.query_row("SELECT id FROM users WHERE email = ?", &[email.into()])?
            .map(|r| r.get_i64(0))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.seed_demo("demo-hash").unwrap();
        db.seed_demo("demo-hash").unwrap();

        let users = db.query("SELECT COUNT(*) FROM users", &[]).unwrap();
        assert_eq!(users[0].get_i64(0).unwrap(), 2);
        let listings = db.query("SELECT COUNT(*) FROM listings", &[]).unwrap();
        assert_eq!(listings[0].get_i64(0).unwrap(), 6);

        // seeded accounts can log in without a manual verification step
        let john = db.user_auth_by_email("john.doe@asu.edu").unwrap().unwrap();
        assert!(db.has_verified_email(john.id).unwrap());
    }
}
