use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::error::SelectionError;

/// A non-empty set of backends to purge, iterated in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BackendKind>", into = "Vec<BackendKind>")]
pub struct Selection {
    kinds: BTreeSet<BackendKind>,
}

impl Selection {
    /// Duplicates collapse; an empty input is rejected.
    pub fn new(kinds: impl IntoIterator<Item = BackendKind>) -> Result<Self, SelectionError> {
        let kinds: BTreeSet<_> = kinds.into_iter().collect();
        if kinds.is_empty() {
            return Err(SelectionError::EmptySelection);
        }
        Ok(Self { kinds })
    }

    pub fn all() -> Self {
        Self {
            kinds: BackendKind::ALL.into_iter().collect(),
        }
    }

    pub fn one(kind: BackendKind) -> Self {
        Self {
            kinds: BTreeSet::from([kind]),
        }
    }

    /// Parse backend slugs such as `edge` or `cdn`
    pub fn parse<I, S>(slugs: I) -> Result<Self, SelectionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kinds = slugs
            .into_iter()
            .map(|slug| slug.as_ref().parse::<BackendKind>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(kinds)
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.kinds.iter().copied()
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Always false
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn is_all(&self) -> bool {
        self.kinds.len() == BackendKind::ALL.len()
    }
}

impl TryFrom<Vec<BackendKind>> for Selection {
    type Error = SelectionError;

    fn try_from(kinds: Vec<BackendKind>) -> Result<Self, Self::Error> {
        Self::new(kinds)
    }
}

impl From<Selection> for Vec<BackendKind> {
    fn from(selection: Selection) -> Self {
        selection.kinds.into_iter().collect()
    }
}

impl From<BackendKind> for Selection {
    fn from(kind: BackendKind) -> Self {
        Self::one(kind)
    }
}

/// Comma separated slugs: `edge,cdn`
impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.split(',').map(str::trim).filter(|slug| !slug.is_empty()))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slugs: Vec<_> = self.iter().map(|kind| kind.slug()).collect();
        f.write_str(&slugs.join(","))
    }
}
