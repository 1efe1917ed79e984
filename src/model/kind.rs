use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::PariahError;

/// Relationship between a composite and one of its component types.
///
/// The cardinality decides where the foreign key lives:
/// - `OneToOne` / `ManyToOne`: `<component>_id` on the composite's row
/// - `OneToMany`: `<composite>_id` on each component's row
/// - `ManyToMany`: `<component>_ids` on the composite's row, comma separated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// Short mnemonic: `O` is one, `M` is many.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "OO",
            Cardinality::OneToMany => "OM",
            Cardinality::ManyToOne => "MO",
            Cardinality::ManyToMany => "MM",
        }
    }
}

/// Declared fields and component structure of an entity type.
#[derive(Debug)]
pub struct Schema {
    pub fields: &'static [&'static str],
    pub structure: &'static [(EntityKind, Cardinality)],
}

impl Schema {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    pub fn cardinality_of(&self, kind: EntityKind) -> Option<Cardinality> {
        self.structure
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, c)| *c)
    }

    pub fn is_composite(&self) -> bool {
        !self.structure.is_empty()
    }
}

use Cardinality::*;

static RESOURCE: Schema = Schema {
    fields: &["parent"],
    structure: &[(EntityKind::Rule, ManyToMany)],
};

static BLOG: Schema = Schema {
    fields: &["parent", "title"],
    structure: &[
        (EntityKind::Rule, ManyToMany),
        (EntityKind::BlogArticle, OneToMany),
        (EntityKind::User, OneToOne),
    ],
};

static BLOG_ARTICLE: Schema = Schema {
    fields: &["parent", "title", "body", "teaser", "created", "date"],
    structure: &[(EntityKind::Rule, ManyToMany), (EntityKind::User, ManyToOne)],
};

static USER: Schema = Schema {
    fields: &["parent", "username", "passwordHash", "email"],
    structure: &[(EntityKind::Rule, ManyToMany), (EntityKind::Role, ManyToMany)],
};

static ROLE: Schema = Schema {
    fields: &["name", "parent"],
    structure: &[],
};

static RULE: Schema = Schema {
    fields: &["name", "permit"],
    structure: &[(EntityKind::Role, ManyToMany), (EntityKind::Action, ManyToMany)],
};

static ACTION: Schema = Schema {
    fields: &["name"],
    structure: &[],
};

/// Every entity type known to the mapping layer.
///
/// Each variant maps to a static [`Schema`]; type names from configuration
/// and resource ids are resolved through [`EntityKind::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Action,
    Blog,
    BlogArticle,
    Resource,
    Role,
    Rule,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Action,
        EntityKind::Blog,
        EntityKind::BlogArticle,
        EntityKind::Resource,
        EntityKind::Role,
        EntityKind::Rule,
        EntityKind::User,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Action => "Action",
            EntityKind::Blog => "Blog",
            EntityKind::BlogArticle => "BlogArticle",
            EntityKind::Resource => "Resource",
            EntityKind::Role => "Role",
            EntityKind::Rule => "Rule",
            EntityKind::User => "User",
        }
    }

    pub fn schema(self) -> &'static Schema {
        match self {
            EntityKind::Action => &ACTION,
            EntityKind::Blog => &BLOG,
            EntityKind::BlogArticle => &BLOG_ARTICLE,
            EntityKind::Resource => &RESOURCE,
            EntityKind::Role => &ROLE,
            EntityKind::Rule => &RULE,
            EntityKind::User => &USER,
        }
    }

    /// Kinds that carry a parent resource id and attached rules.
    pub fn is_resource(self) -> bool {
        matches!(
            self,
            EntityKind::Resource | EntityKind::Blog | EntityKind::BlogArticle | EntityKind::User
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = PariahError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PariahError::Configuration(format!("unknown entity type `{s}`")))
    }
}
