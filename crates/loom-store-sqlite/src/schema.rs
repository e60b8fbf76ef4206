//! SQL schema for the Loom SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS ratings (
    rating_id            TEXT PRIMARY KEY,
    submitted_at         TEXT NOT NULL,   -- RFC 3339 UTC, fixed width; server-assigned
    updated_at           TEXT NOT NULL,
    year                 INTEGER NOT NULL,
    month                INTEGER NOT NULL,
    day                  INTEGER NOT NULL,
    product_description  TEXT NOT NULL,
    item                 TEXT NOT NULL,
    combo_or_variant     TEXT NOT NULL,
    color                TEXT NOT NULL,
    customer_segment     TEXT NOT NULL,   -- display label, e.g. 'Sam''s Club'
    star1                INTEGER NOT NULL DEFAULT 0,
    star2                INTEGER NOT NULL DEFAULT 0,
    star3                INTEGER NOT NULL DEFAULT 0,
    star4                INTEGER NOT NULL DEFAULT 0,
    star5                INTEGER NOT NULL DEFAULT 0,
    overall_rating       REAL NOT NULL CHECK (overall_rating BETWEEN 0 AND 5),
    total_review_count   INTEGER NOT NULL CHECK (total_review_count >= 1),
    review_comments      TEXT NOT NULL DEFAULT '',
    nature_of_review     TEXT NOT NULL,
    happy_customer       INTEGER NOT NULL DEFAULT 0,
    customer_expectation TEXT NOT NULL,
    quality_issues       TEXT NOT NULL DEFAULT '{}',   -- JSON object, issue key -> bool
    form_type            TEXT NOT NULL    -- 'feedback' | 'review'
);

CREATE INDEX IF NOT EXISTS ratings_submitted_idx ON ratings(submitted_at);
CREATE INDEX IF NOT EXISTS ratings_segment_idx   ON ratings(customer_segment);
CREATE INDEX IF NOT EXISTS ratings_period_idx    ON ratings(year, month);
CREATE INDEX IF NOT EXISTS ratings_product_idx   ON ratings(product_description);

PRAGMA user_version = 1;
";

/// Column list shared by every `SELECT`, in [`crate::encode::RawRating`] order.
pub const COLUMNS: &str = "
    rating_id, submitted_at, updated_at, year, month, day,
    product_description, item, combo_or_variant, color, customer_segment,
    star1, star2, star3, star4, star5,
    overall_rating, total_review_count, review_comments, nature_of_review,
    happy_customer, customer_expectation, quality_issues, form_type";
