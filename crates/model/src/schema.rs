use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// One of the fifteen user data tables that take part in a merge.
///
/// Variants are declared in merge order, so the derived [`Ord`] sorts entity
/// types the same way [`EntityGraph`](crate::EntityGraph) processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityType {
    Location,
    InputField,
    Bookmark,
    UserMark,
    BlockRange,
    Note,
    IndependentMedia,
    PlaylistItem,
    PlaylistItemIndependentMediaMap,
    PlaylistItemLocationMap,
    Tag,
    TagMap,
    PlaylistItemMarker,
    PlaylistItemMarkerBibleVerseMap,
    PlaylistItemMarkerParagraphMap,
}

/// A column holding another entity's surrogate id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: EntityType,
}

/// One set of business-key columns used to find an existing destination row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCriteria {
    pub fields: &'static [&'static str],
    /// Compare the stored `IFNULL(column, '')` with `=` instead of NULL-safe
    /// `IS`. The probe value is not substituted, so a NULL in the incoming row
    /// never satisfies the criteria.
    pub null_as_empty: bool,
}

/// Static description of one table.
///
/// `columns` lists every persisted column in table order, surrogate id
/// included. The id is never written on insert: the destination assigns a
/// fresh one.
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub entity: EntityType,
    pub table: &'static str,
    pub id_column: Option<&'static str>,
    pub columns: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
    /// Match criteria in priority order; empty when the type is never deduplicated.
    pub dedup: &'static [MatchCriteria],
}

impl EntitySchema {
    /// Position of `column` in [`columns`](Self::columns).
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// Columns written on insert (everything except the surrogate id).
    pub fn insert_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().copied().filter(|c| Some(*c) != self.id_column)
    }

    pub fn is_deduplicated(&self) -> bool {
        !self.dedup.is_empty()
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }
}

const fn fk(column: &'static str, references: EntityType) -> ForeignKey {
    ForeignKey { column, references }
}

// =========================================================================
// Descriptors
// =========================================================================

static LOCATION: EntitySchema = EntitySchema {
    entity: EntityType::Location,
    table: "Location",
    id_column: Some("LocationId"),
    columns: &[
        "LocationId",
        "BookNumber",
        "ChapterNumber",
        "DocumentId",
        "Track",
        "IssueTagNumber",
        "KeySymbol",
        "MepsLanguage",
        "Type",
        "Title",
    ],
    foreign_keys: &[],
    dedup: &[
        MatchCriteria {
            fields: &["KeySymbol", "IssueTagNumber", "MepsLanguage", "BookNumber", "DocumentId", "Track", "Type"],
            null_as_empty: true,
        },
        // Unlike its neighbours this one has never substituted '' for NULL.
        // Kept that way until someone can say which behaviour is intended.
        MatchCriteria {
            fields: &["BookNumber", "ChapterNumber", "KeySymbol", "MepsLanguage", "Type"],
            null_as_empty: false,
        },
        MatchCriteria {
            fields: &["KeySymbol", "IssueTagNumber", "MepsLanguage", "DocumentId", "Track", "Type"],
            null_as_empty: true,
        },
    ],
};

static INPUT_FIELD: EntitySchema = EntitySchema {
    entity: EntityType::InputField,
    table: "InputField",
    id_column: None,
    columns: &["LocationId", "TextTag", "Value"],
    foreign_keys: &[fk("LocationId", EntityType::Location)],
    dedup: &[],
};

static BOOKMARK: EntitySchema = EntitySchema {
    entity: EntityType::Bookmark,
    table: "Bookmark",
    id_column: Some("BookmarkId"),
    columns: &[
        "BookmarkId",
        "LocationId",
        "PublicationLocationId",
        "Slot",
        "Title",
        "Snippet",
        "BlockType",
        "BlockIdentifier",
    ],
    foreign_keys: &[fk("LocationId", EntityType::Location), fk("PublicationLocationId", EntityType::Location)],
    dedup: &[],
};

static USER_MARK: EntitySchema = EntitySchema {
    entity: EntityType::UserMark,
    table: "UserMark",
    id_column: Some("UserMarkId"),
    columns: &["UserMarkId", "ColorIndex", "LocationId", "StyleIndex", "UserMarkGuid", "Version"],
    foreign_keys: &[fk("LocationId", EntityType::Location)],
    dedup: &[],
};

static BLOCK_RANGE: EntitySchema = EntitySchema {
    entity: EntityType::BlockRange,
    table: "BlockRange",
    id_column: Some("BlockRangeId"),
    columns: &["BlockRangeId", "BlockType", "Identifier", "StartToken", "EndToken", "UserMarkId"],
    foreign_keys: &[fk("UserMarkId", EntityType::UserMark)],
    dedup: &[],
};

static NOTE: EntitySchema = EntitySchema {
    entity: EntityType::Note,
    table: "Note",
    id_column: Some("NoteId"),
    columns: &[
        "NoteId",
        "Guid",
        "UserMarkId",
        "LocationId",
        "Title",
        "Content",
        "LastModified",
        "Created",
        "BlockType",
        "BlockIdentifier",
    ],
    foreign_keys: &[fk("UserMarkId", EntityType::UserMark), fk("LocationId", EntityType::Location)],
    dedup: &[],
};

static INDEPENDENT_MEDIA: EntitySchema = EntitySchema {
    entity: EntityType::IndependentMedia,
    table: "IndependentMedia",
    id_column: Some("IndependentMediaId"),
    columns: &["IndependentMediaId", "OriginalFilename", "FilePath", "MimeType", "Hash"],
    foreign_keys: &[],
    dedup: &[],
};

static PLAYLIST_ITEM: EntitySchema = EntitySchema {
    entity: EntityType::PlaylistItem,
    table: "PlaylistItem",
    id_column: Some("PlaylistItemId"),
    columns: &[
        "PlaylistItemId",
        "Label",
        "StartTrimOffsetTicks",
        "EndTrimOffsetTicks",
        "Accuracy",
        "EndAction",
        "ThumbnailFilePath",
    ],
    foreign_keys: &[],
    dedup: &[],
};

static PLAYLIST_ITEM_INDEPENDENT_MEDIA_MAP: EntitySchema = EntitySchema {
    entity: EntityType::PlaylistItemIndependentMediaMap,
    table: "PlaylistItemIndependentMediaMap",
    id_column: None,
    columns: &["PlaylistItemId", "IndependentMediaId", "DurationTicks"],
    foreign_keys: &[
        fk("PlaylistItemId", EntityType::PlaylistItem),
        fk("IndependentMediaId", EntityType::IndependentMedia),
    ],
    dedup: &[],
};

static PLAYLIST_ITEM_LOCATION_MAP: EntitySchema = EntitySchema {
    entity: EntityType::PlaylistItemLocationMap,
    table: "PlaylistItemLocationMap",
    id_column: None,
    columns: &["PlaylistItemId", "LocationId", "MajorMultimediaType", "BaseDurationTicks"],
    foreign_keys: &[fk("PlaylistItemId", EntityType::PlaylistItem), fk("LocationId", EntityType::Location)],
    dedup: &[],
};

static TAG: EntitySchema = EntitySchema {
    entity: EntityType::Tag,
    table: "Tag",
    id_column: Some("TagId"),
    columns: &["TagId", "Type", "Name"],
    foreign_keys: &[],
    dedup: &[MatchCriteria { fields: &["Type", "Name"], null_as_empty: false }],
};

static TAG_MAP: EntitySchema = EntitySchema {
    entity: EntityType::TagMap,
    table: "TagMap",
    id_column: Some("TagMapId"),
    columns: &["TagMapId", "PlaylistItemId", "LocationId", "NoteId", "TagId", "Position"],
    foreign_keys: &[
        fk("PlaylistItemId", EntityType::PlaylistItem),
        fk("LocationId", EntityType::Location),
        fk("NoteId", EntityType::Note),
        fk("TagId", EntityType::Tag),
    ],
    dedup: &[],
};

static PLAYLIST_ITEM_MARKER: EntitySchema = EntitySchema {
    entity: EntityType::PlaylistItemMarker,
    table: "PlaylistItemMarker",
    id_column: Some("PlaylistItemMarkerId"),
    columns: &[
        "PlaylistItemMarkerId",
        "PlaylistItemId",
        "Label",
        "StartTimeTicks",
        "DurationTicks",
        "EndTransitionDurationTicks",
    ],
    foreign_keys: &[fk("PlaylistItemId", EntityType::PlaylistItem)],
    dedup: &[],
};

static PLAYLIST_ITEM_MARKER_BIBLE_VERSE_MAP: EntitySchema = EntitySchema {
    entity: EntityType::PlaylistItemMarkerBibleVerseMap,
    table: "PlaylistItemMarkerBibleVerseMap",
    id_column: None,
    columns: &["PlaylistItemMarkerId", "VerseId"],
    foreign_keys: &[fk("PlaylistItemMarkerId", EntityType::PlaylistItemMarker)],
    dedup: &[],
};

static PLAYLIST_ITEM_MARKER_PARAGRAPH_MAP: EntitySchema = EntitySchema {
    entity: EntityType::PlaylistItemMarkerParagraphMap,
    table: "PlaylistItemMarkerParagraphMap",
    id_column: None,
    columns: &["PlaylistItemMarkerId", "MepsDocumentId", "ParagraphIndex", "MarkerIndexWithinParagraph"],
    foreign_keys: &[fk("PlaylistItemMarkerId", EntityType::PlaylistItemMarker)],
    dedup: &[],
};

impl EntityType {
    /// Static schema descriptor for this table.
    pub fn schema(&self) -> &'static EntitySchema {
        match self {
            EntityType::Location => &LOCATION,
            EntityType::InputField => &INPUT_FIELD,
            EntityType::Bookmark => &BOOKMARK,
            EntityType::UserMark => &USER_MARK,
            EntityType::BlockRange => &BLOCK_RANGE,
            EntityType::Note => &NOTE,
            EntityType::IndependentMedia => &INDEPENDENT_MEDIA,
            EntityType::PlaylistItem => &PLAYLIST_ITEM,
            EntityType::PlaylistItemIndependentMediaMap => &PLAYLIST_ITEM_INDEPENDENT_MEDIA_MAP,
            EntityType::PlaylistItemLocationMap => &PLAYLIST_ITEM_LOCATION_MAP,
            EntityType::Tag => &TAG,
            EntityType::TagMap => &TAG_MAP,
            EntityType::PlaylistItemMarker => &PLAYLIST_ITEM_MARKER,
            EntityType::PlaylistItemMarkerBibleVerseMap => &PLAYLIST_ITEM_MARKER_BIBLE_VERSE_MAP,
            EntityType::PlaylistItemMarkerParagraphMap => &PLAYLIST_ITEM_MARKER_PARAGRAPH_MAP,
        }
    }

    /// Table name in `userData.db`.
    pub fn as_str(&self) -> &'static str {
        self.schema().table
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // SQLite table names are case-insensitive, and so is this.
        crate::MERGE_ORDER
            .iter()
            .copied()
            .find(|entity| entity.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| exn::Exn::from(ErrorKind::UnknownEntity(s.to_string())))
    }
}
