//! Media capabilities and their negotiation.
//!
//! Caps are reduced to a set of media types (`video/x-raw`, `audio/x-raw`, ...).
//! Field constraints such as `width=1280` are accepted when parsing but do not
//! take part in negotiation.

use std::fmt;

const ANY: &str = "ANY";

/// A set of media types a connector can produce or accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    any: bool,
    media_types: Vec<String>,
}

impl Caps {
    /// Caps that intersect with everything.
    pub fn any() -> Self {
        Self {
            any: true,
            media_types: Vec::new(),
        }
    }

    /// Caps that intersect with nothing.
    pub fn empty() -> Self {
        Self {
            any: false,
            media_types: Vec::new(),
        }
    }

    pub fn new_simple(media_type: &str) -> Self {
        Self::from_media_types([media_type])
    }

    pub fn from_media_types<I, S>(media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut caps = Self::empty();
        for media_type in media_types {
            let media_type = media_type.as_ref().trim();
            if media_type == ANY {
                return Self::any();
            }
            if !media_type.is_empty() && !caps.media_types.iter().any(|m| m == media_type) {
                caps.media_types.push(media_type.to_string());
            }
        }
        caps
    }

    /// Parse `"video/x-raw,width=1280,height=720; audio/x-raw"`.
    pub fn from_string(s: &str) -> Self {
        Self::from_media_types(
            s.split(';')
                .map(|structure| structure.split(',').next().unwrap_or("").trim()),
        )
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        self.any
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.any && self.media_types.is_empty()
    }

    pub fn media_types(&self) -> &[String] {
        &self.media_types
    }

    pub fn intersect(&self, other: &Caps) -> Caps {
        match (self.any, other.any) {
            (true, _) => other.clone(),
            (_, true) => self.clone(),
            _ => Self::from_media_types(
                self.media_types
                    .iter()
                    .filter(|m| other.media_types.contains(m)),
            ),
        }
    }

    pub fn can_intersect(&self, other: &Caps) -> bool {
        !self.intersect(other).is_empty()
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any {
            write!(f, "{ANY}")
        } else if self.media_types.is_empty() {
            write!(f, "EMPTY")
        } else {
            write!(f, "{}", self.media_types.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_drops_fields() {
        let caps = Caps::from_string("video/x-raw,width=1280,height=720");
        assert_eq!(caps.media_types(), &["video/x-raw".to_string()]);
        assert_eq!(caps.to_string(), "video/x-raw");
    }

    #[test]
    fn test_any_intersects_everything_but_empty() {
        let raw = Caps::new_simple("video/x-raw");
        assert_eq!(Caps::any().intersect(&raw), raw);
        assert!(Caps::any().can_intersect(&Caps::any()));
        assert!(!Caps::any().can_intersect(&Caps::empty()));
        assert!(Caps::from_string("ANY").is_any());
    }

    #[test]
    fn test_disjoint_media_types() {
        let video = Caps::new_simple("video/x-raw");
        let audio = Caps::new_simple("audio/x-raw");
        assert!(!video.can_intersect(&audio));
        assert!(video.intersect(&audio).is_empty());
    }

    fn media_type() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "video/x-raw",
            "audio/x-raw",
            "video/x-h264",
            "application/x-rtp",
        ])
        .prop_map(str::to_string)
    }

    proptest! {
        #[test]
        fn test_intersection_is_symmetric(
            a in prop::collection::vec(media_type(), 0..4),
            b in prop::collection::vec(media_type(), 0..4),
        ) {
            let a = Caps::from_media_types(&a);
            let b = Caps::from_media_types(&b);
            prop_assert_eq!(a.can_intersect(&b), b.can_intersect(&a));
        }

        #[test]
        fn test_intersection_is_subset_of_both(
            a in prop::collection::vec(media_type(), 1..4),
            b in prop::collection::vec(media_type(), 1..4),
        ) {
            let a = Caps::from_media_types(&a);
            let b = Caps::from_media_types(&b);
            let both = a.intersect(&b);
            for m in both.media_types() {
                prop_assert!(a.media_types().contains(m));
                prop_assert!(b.media_types().contains(m));
            }
        }
    }
}
