//! # Decentralized Identifiers
//!
//! `Did` validates the syntax `did:<method>:<namespace>:<identifier>`.
//! The namespace is optional: `did:example:org1` is a DID with method
//! `example`, no namespace and identifier `org1`. With more than one
//! segment after the method, the last segment is the identifier and the
//! ones before it form the namespace.
//!
//! Syntax is all a `Did` guarantees. Whether the method is one this
//! deployment resolves is a policy question answered by
//! [`DidMethodRegistry`]; whether the DID is registered is answered by the
//! registry.
//!
//! `DidUrl` is a DID plus a `#fragment`, the form used to name a
//! verification method (`did:verity:gov:commission#key-1`).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Deserialize by routing the raw string through the validating constructor.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A syntactically valid Decentralized Identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Did(String);

impl_validating_deserialize!(Did);

impl Did {
    /// Validate and wrap a DID string.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidDid`] if the prefix is not `did:`, the
    /// method is empty or not lowercase alphanumeric, any segment after the
    /// method is empty, or a segment contains characters outside
    /// `[A-Za-z0-9._%-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        let invalid = || ValidationError::InvalidDid(s.to_string());
        let rest = s.strip_prefix("did:").ok_or_else(invalid)?;
        let (method, specific) = rest.split_once(':').ok_or_else(invalid)?;

        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid());
        }

        for segment in specific.split(':') {
            if segment.is_empty() || !segment.chars().all(is_id_char) {
                return Err(invalid());
            }
        }
        Ok(())
    }

    /// The DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The method, e.g. `verity` in `did:verity:gov:commission`.
    pub fn method(&self) -> &str {
        self.parts().0
    }

    /// Everything after `did:<method>:`.
    pub fn method_specific_id(&self) -> &str {
        self.parts().1
    }

    /// The namespace segments, joined with `:`. Empty when the DID has a
    /// single segment after the method.
    pub fn namespace(&self) -> &str {
        let specific = self.method_specific_id();
        specific.rsplit_once(':').map(|(ns, _)| ns).unwrap_or("")
    }

    /// The final segment.
    pub fn identifier(&self) -> &str {
        let specific = self.method_specific_id();
        specific.rsplit_once(':').map(|(_, id)| id).unwrap_or(specific)
    }

    /// Build a `DidUrl` for `#fragment` under this DID.
    pub fn with_fragment(&self, fragment: &str) -> Result<DidUrl, ValidationError> {
        DidUrl::from_parts(self.clone(), fragment)
    }

    fn parts(&self) -> (&str, &str) {
        // Validated at construction: the prefix and a method separator exist.
        let rest = &self.0[4..];
        rest.split_once(':').unwrap_or((rest, ""))
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Did {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '%')
}

fn is_fragment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '~' | '%' | ':')
}

/// A DID with a fragment, naming one verification method or service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct DidUrl {
    did: Did,
    fragment: String,
}

impl_validating_deserialize!(DidUrl);

impl DidUrl {
    /// Parse `did:...#fragment`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let (did, fragment) = s
            .split_once('#')
            .ok_or_else(|| ValidationError::field("did_url", format!("{s:?} has no #fragment")))?;
        Self::from_parts(Did::new(did)?, fragment)
    }

    /// Resolve a reference that is either absolute (`did:...#frag`) or
    /// relative to `base` (`#frag`).
    pub fn resolve_against(base: &Did, reference: &str) -> Result<Self, ValidationError> {
        match reference.strip_prefix('#') {
            Some(fragment) => Self::from_parts(base.clone(), fragment),
            None => Self::new(reference),
        }
    }

    fn from_parts(did: Did, fragment: &str) -> Result<Self, ValidationError> {
        if fragment.is_empty() || !fragment.chars().all(is_fragment_char) {
            return Err(ValidationError::field(
                "did_url",
                format!("invalid fragment {fragment:?}"),
            ));
        }
        Ok(Self {
            did,
            fragment: fragment.to_string(),
        })
    }

    /// The DID part.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The fragment, without `#`.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

impl std::fmt::Display for DidUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.did, self.fragment)
    }
}

impl From<DidUrl> for String {
    fn from(url: DidUrl) -> Self {
        url.to_string()
    }
}

impl std::str::FromStr for DidUrl {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The DID methods a deployment is willing to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidMethodRegistry {
    methods: BTreeSet<String>,
}

impl DidMethodRegistry {
    /// Methods every deployment knows about.
    pub const DEFAULT_METHODS: [&'static str; 4] = ["verity", "example", "web", "key"];

    /// Build from an explicit list.
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `method` is known.
    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    /// Parse a DID and require a known method.
    pub fn parse(&self, s: &str) -> Result<Did, ValidationError> {
        let did = Did::new(s)?;
        self.check(&did)?;
        Ok(did)
    }

    /// Require that an already-parsed DID uses a known method.
    pub fn check(&self, did: &Did) -> Result<(), ValidationError> {
        if self.contains(did.method()) {
            Ok(())
        } else {
            Err(ValidationError::UnknownMethod {
                did: did.to_string(),
                method: did.method().to_string(),
            })
        }
    }

    /// Iterate the known methods in sorted order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }
}

impl Default for DidMethodRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_METHODS)
    }
}
