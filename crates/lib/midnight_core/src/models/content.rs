//! Content domain models: poems, songs and thoughts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three publishable content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Poem,
    Song,
    Thought,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Poem, ContentKind::Song, ContentKind::Thought];

    /// Capitalized singular, used in response messages ("Poem not found").
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Poem => "Poem",
            ContentKind::Song => "Song",
            ContentKind::Thought => "Thought",
        }
    }

    /// Capitalized plural ("Poems retrieved successfully").
    pub fn plural_label(&self) -> &'static str {
        match self {
            ContentKind::Poem => "Poems",
            ContentKind::Song => "Songs",
            ContentKind::Thought => "Thoughts",
        }
    }

    /// Lowercase singular ("Unauthorized to delete poem").
    pub fn noun(&self) -> &'static str {
        match self {
            ContentKind::Poem => "poem",
            ContentKind::Song => "song",
            ContentKind::Thought => "thought",
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Poem => "poems",
            ContentKind::Song => "songs",
            ContentKind::Thought => "thoughts",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// Visibility state of a content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    #[default]
    Draft,
    Published,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Draft => "DRAFT",
            PublicationStatus::Published => "PUBLISHED",
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(PublicationStatus::Draft),
            "PUBLISHED" => Ok(PublicationStatus::Published),
            other => Err(format!("unknown publication status '{other}'")),
        }
    }
}

/// A stored poem, song or thought.
///
/// `title` is set for poems and songs, `audio_url` only ever for songs.
/// `body` holds the poem content, the song lyrics or the thought content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: i64,
    pub kind: ContentKind,
    pub owner_id: i64,
    pub title: Option<String>,
    pub body: String,
    pub audio_url: Option<String>,
    pub status: PublicationStatus,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
}

impl ContentRecord {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }

    /// Drafts are visible to their owner only; published records to anyone.
    pub fn is_visible_to(&self, viewer: Option<i64>) -> bool {
        match self.status {
            PublicationStatus::Published => true,
            PublicationStatus::Draft => viewer.is_some_and(|id| self.is_owned_by(id)),
        }
    }
}

/// Input for creating a content record.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub kind: ContentKind,
    pub owner_id: i64,
    pub title: Option<String>,
    pub body: String,
    pub audio_url: Option<String>,
    pub status: PublicationStatus,
}

/// Which records a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFilter {
    /// Everything owned by a user, optionally narrowed to one status.
    Owner {
        owner_id: i64,
        status: Option<PublicationStatus>,
    },
    /// Published records of every user.
    Published,
}

impl ContentFilter {
    pub fn matches(&self, record: &ContentRecord) -> bool {
        match *self {
            ContentFilter::Owner { owner_id, status } => {
                record.owner_id == owner_id && status.is_none_or(|s| s == record.status)
            }
            ContentFilter::Published => record.status == PublicationStatus::Published,
        }
    }
}

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based page request, newest records first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Build a request, clamping `size` into `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.request.size))
    }

    pub fn is_last(&self) -> bool {
        u64::from(self.request.page) + 1 >= self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            request: self.request,
            total: self.total,
        }
    }
}
