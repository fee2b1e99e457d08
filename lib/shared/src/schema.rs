use std::fmt;
use std::str::FromStr;

/// A field of the snapshot document written by the producer.
///
/// The declaration order is the schema order: parsed records list their
/// fields in this order and new datasets get their columns in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Timestamp,
    Title,
    Artist,
    IsExplicit,
    LyricsSnippet,
    LyricSnippetSynced,
    Artwork,
    VideoUrl,
    ShazamUrl,
    AppleMusicUrl,
    Name,
}

impl Field {
    /// Every snapshot field, in schema order.
    pub const ALL: [Field; 11] = [
        Field::Timestamp,
        Field::Title,
        Field::Artist,
        Field::IsExplicit,
        Field::LyricsSnippet,
        Field::LyricSnippetSynced,
        Field::Artwork,
        Field::VideoUrl,
        Field::ShazamUrl,
        Field::AppleMusicUrl,
        Field::Name,
    ];

    /// Fields identifying a media event for deduplication.
    pub const KEY: [Field; 3] = [Field::Artist, Field::Title, Field::Name];

    /// Element / column name of this field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp",
            Field::Title => "title",
            Field::Artist => "artist",
            Field::IsExplicit => "isexplicit",
            Field::LyricsSnippet => "lyricssnippet",
            Field::LyricSnippetSynced => "lyricsnippetsynced",
            Field::Artwork => "artwork",
            Field::VideoUrl => "videourl",
            Field::ShazamUrl => "shazamurl",
            Field::AppleMusicUrl => "applemusicurl",
            Field::Name => "name",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown snapshot field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn schema_names_are_unique_and_round_trip() {
        let names: HashSet<_> = Field::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names.len(), Field::ALL.len());

        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>(), Ok(field));
        }
    }

    #[test]
    fn key_fields_are_part_of_the_schema() {
        for field in Field::KEY {
            assert!(Field::ALL.contains(&field));
        }
        assert!(!Field::KEY.contains(&Field::Timestamp));
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            "album".parse::<Field>(),
            Err(UnknownField("album".to_string()))
        );
    }
}
