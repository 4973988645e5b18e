//! Domain, tier, and object reference definitions.

use crate::{define_name, IdError};

// =============================================================================
// Names
// =============================================================================

// Domains are opaque tenant keys; only the canonical separator is reserved.
define_name!(Domain, "domain", |c: char| c == '/');
define_name!(ObjectName, "object name", |c: char| {
    c == '/' || c.is_whitespace() || c.is_control()
});

// =============================================================================
// Tiers
// =============================================================================

/// Provisioning tier of a managed object.
///
/// Tiers are strictly ordered: a tier's objects are only dispatched once
/// every lower tier has settled for the same domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// No prerequisites (e.g. roles).
    One,
    /// Requires every tier-1 object of the domain (e.g. grants).
    Two,
    /// Requires tier 1 and tier 2 (e.g. users).
    Three,
}

impl Tier {
    /// All tiers in provisioning order.
    pub const ALL: [Tier; 3] = [Tier::One, Tier::Two, Tier::Three];

    /// Zero-based position of the tier in provisioning order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Tier::One => 0,
            Tier::Two => 1,
            Tier::Three => 2,
        }
    }

    /// Canonical label (`tier1`, `tier2`, `tier3`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::One => "tier1",
            Tier::Two => "tier2",
            Tier::Three => "tier3",
        }
    }

    /// Tiers that must be ready before this tier may be dispatched.
    #[must_use]
    pub fn prerequisites(self) -> &'static [Tier] {
        match self {
            Tier::One => &[],
            Tier::Two => &[Tier::One],
            Tier::Three => &[Tier::One, Tier::Two],
        }
    }

    /// The tier released when this one settles, if any.
    #[must_use]
    pub const fn next(self) -> Option<Tier> {
        match self {
            Tier::One => Some(Tier::Two),
            Tier::Two => Some(Tier::Three),
            Tier::Three => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, IdError> {
        match s {
            "tier1" | "1" => Ok(Tier::One),
            "tier2" | "2" => Ok(Tier::Two),
            "tier3" | "3" => Ok(Tier::Three),
            other => Err(IdError::InvalidTier(other.to_string())),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Tier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Tier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Object References
// =============================================================================

/// Identifies one schedulable unit: `(domain, tier, name)`.
///
/// References are immutable; a reference belongs to exactly one tier for
/// its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    domain: Domain,
    tier: Tier,
    name: ObjectName,
}

impl ObjectRef {
    /// Creates a reference from already-validated parts.
    #[must_use]
    pub fn new(domain: Domain, tier: Tier, name: ObjectName) -> Self {
        Self { domain, tier, name }
    }

    /// Parses and validates each part, then builds the reference.
    pub fn from_parts(domain: &str, tier: Tier, name: &str) -> Result<Self, IdError> {
        Ok(Self::new(Domain::parse(domain)?, tier, ObjectName::parse(name)?))
    }

    /// Parses the canonical `{domain}/{tier}/{name}` form.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty {
                kind: "object reference",
            });
        }

        let mut parts = s.splitn(3, '/');
        let (Some(domain), Some(tier), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(IdError::InvalidFormat {
                message: format!("expected 'domain/tier/name', got '{s}'"),
            });
        };

        Ok(Self::new(
            Domain::parse(domain)?,
            Tier::parse(tier)?,
            ObjectName::parse(name)?,
        ))
    }

    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub fn name(&self) -> &ObjectName {
        &self.name
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.domain, self.tier, self.name)
    }
}

impl std::str::FromStr for ObjectRef {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ObjectRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ObjectRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_object_ref_roundtrip() {
        let r = ObjectRef::from_parts("east", Tier::Two, "db-admin-on-orders").unwrap();
        let s = r.to_string();
        assert_eq!(s, "east/tier2/db-admin-on-orders");
        let parsed: ObjectRef = s.parse().unwrap();
        assert_eq!(r, parsed);
    }

    #[test]
    fn test_object_ref_missing_parts() {
        let result: Result<ObjectRef, _> = "east/tier1".parse();
        assert!(matches!(result.unwrap_err(), IdError::InvalidFormat { .. }));
    }

    #[test]
    fn test_object_ref_bad_tier() {
        let result: Result<ObjectRef, _> = "east/tier9/x".parse();
        assert!(matches!(result.unwrap_err(), IdError::InvalidTier(_)));
    }

    #[test]
    fn test_object_ref_name_with_slash_rejected() {
        let result: Result<ObjectRef, _> = "east/tier1/a/b".parse();
        assert!(matches!(
            result.unwrap_err(),
            IdError::InvalidCharacter { ch: '/', .. }
        ));
    }

    #[test]
    fn test_object_ref_empty() {
        let result: Result<ObjectRef, _> = "".parse();
        assert!(result.unwrap_err().is_empty());
    }

    #[test]
    fn test_domain_is_opaque() {
        let domain = Domain::parse("East Coast\tprod").unwrap();
        assert_eq!(domain.as_str(), "East Coast\tprod");

        let r = ObjectRef::from_parts("tenant a", Tier::One, "b").unwrap();
        assert_eq!(r.to_string(), "tenant a/tier1/b");
        assert_eq!(ObjectRef::parse(&r.to_string()).unwrap(), r);
    }

    #[test]
    fn test_domain_rejects_separator() {
        assert!(matches!(
            Domain::parse("east/west").unwrap_err(),
            IdError::InvalidCharacter { ch: '/', .. }
        ));
    }

    #[test]
    fn test_object_name_rejects_whitespace() {
        assert!(matches!(
            ObjectName::parse("bad name").unwrap_err(),
            IdError::InvalidCharacter { ch: ' ', .. }
        ));
    }

    #[test]
    fn test_domain_too_long() {
        let long = "d".repeat(crate::MAX_NAME_LEN + 1);
        assert!(matches!(
            Domain::parse(&long).unwrap_err(),
            IdError::TooLong { .. }
        ));
    }

    #[test]
    fn test_object_ref_json_roundtrip() {
        let r = ObjectRef::from_parts("west", Tier::Three, "alice").unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"west/tier3/alice\"");
        let parsed: ObjectRef = serde_json::from_str(&json).unwrap();
        assert_eq!(r, parsed);
    }

    #[test]
    fn test_tier_prerequisites() {
        assert!(Tier::One.prerequisites().is_empty());
        assert_eq!(Tier::Two.prerequisites(), &[Tier::One]);
        assert_eq!(Tier::Three.prerequisites(), &[Tier::One, Tier::Two]);
    }

    #[test]
    fn test_tier_next() {
        assert_eq!(Tier::One.next(), Some(Tier::Two));
        assert_eq!(Tier::Two.next(), Some(Tier::Three));
        assert_eq!(Tier::Three.next(), None);
    }

    #[test]
    fn test_tier_parse_aliases() {
        assert_eq!("1".parse::<Tier>().unwrap(), Tier::One);
        assert_eq!("tier3".parse::<Tier>().unwrap(), Tier::Three);
        assert!("tier0".parse::<Tier>().is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_refs_roundtrip(
            domain in "[a-z0-9][a-z0-9.-]{0,30}",
            name in "[A-Za-z0-9_.:@-]{1,40}",
            tier in prop::sample::select(Tier::ALL.to_vec()),
        ) {
            let r = ObjectRef::from_parts(&domain, tier, &name).unwrap();
            let parsed = ObjectRef::parse(&r.to_string()).unwrap();
            prop_assert_eq!(r, parsed);
        }

        #[test]
        fn prop_parse_never_panics(s in "\\PC{0,64}") {
            let _ = ObjectRef::parse(&s);
        }
    }
}
