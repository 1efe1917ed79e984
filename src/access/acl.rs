use std::collections::{HashMap, HashSet};

use crate::access::{Action, Principal, Resource, ResourceId, Role, Rule, Verdict};
use crate::errors::PariahError;
use crate::mapper::{Criteria, MapperRegistry};
use crate::model::{Entity, EntityKind};

/// An action given by name or as an entity.
#[derive(Debug, Clone, Copy)]
pub enum ActionRef<'a> {
    Name(&'a str),
    Entity(&'a Action),
}

impl<'a> ActionRef<'a> {
    pub fn name(self) -> Option<&'a str> {
        match self {
            ActionRef::Name(name) => Some(name),
            ActionRef::Entity(action) => action.name(),
        }
    }
}

impl<'a> From<&'a str> for ActionRef<'a> {
    fn from(name: &'a str) -> Self {
        ActionRef::Name(name)
    }
}

impl<'a> From<&'a String> for ActionRef<'a> {
    fn from(name: &'a String) -> Self {
        ActionRef::Name(name)
    }
}

impl<'a> From<&'a Action> for ActionRef<'a> {
    fn from(action: &'a Action) -> Self {
        ActionRef::Entity(action)
    }
}

#[derive(Debug)]
struct ResourceNode {
    id: ResourceId,
    parent: Option<usize>,
}

/// (resource depth, role depth); lower is more specific.
type Specificity = (usize, usize);

#[derive(Debug)]
struct RoleNode {
    name: String,
    parent: Option<usize>,
}

/// Allow/deny table for one resource, built once from stored rules.
///
/// Resources and roles live in arenas and link to their parents by index.
/// The resource itself is node 0; its ancestors follow. Precedence when
/// answering a query:
/// - a rule on a closer resource beats one on an ancestor resource
/// - at one resource, a rule for the role beats one for its ancestors
/// - at equal specificity forbid beats permit
#[derive(Debug)]
pub struct ResourceAcl {
    resources: Vec<ResourceNode>,
    roles: Vec<RoleNode>,
    role_index: HashMap<String, usize>,
    /// (resource, role) -> action -> verdict
    rules: HashMap<(usize, usize), HashMap<String, Verdict>>,
}

impl ResourceAcl {
    /// Build the ACL for a saved resource.
    ///
    /// Rules are read from storage for the resource and every ancestor
    /// named through `parent`. Any load failure aborts the build.
    pub fn new(registry: &MapperRegistry, resource: &Resource) -> Result<Self, PariahError> {
        let root = resource.resource_id()?;
        let mut acl = Self {
            resources: Vec::new(),
            roles: Vec::new(),
            role_index: HashMap::new(),
            rules: HashMap::new(),
        };

        // 1. Walk the parent chain
        let mut chain = vec![resource.clone()];
        let mut visited = HashSet::from([root.clone()]);
        let mut next = resource.parent()?;
        while let Some(parent_id) = next {
            if !visited.insert(parent_id.clone()) {
                return Err(PariahError::Cycle(format!(
                    "resource {parent_id} is its own ancestor (reached from {root})"
                )));
            }
            let parent = load_resource(registry, &parent_id)?;
            next = parent.parent()?;
            chain.push(parent);
        }

        for (index, member) in chain.iter().enumerate() {
            acl.resources.push(ResourceNode {
                id: member.resource_id()?,
                parent: (index + 1 < chain.len()).then_some(index + 1),
            });
        }

        // 2. Register each resource's rules
        let mut rule_count = 0;
        for (index, member) in chain.iter().enumerate() {
            let rules = registry
                .component_mapper(member.kind())?
                .fetch_components(registry, member, EntityKind::Rule)?;
            for rule in rules {
                acl.register_rule(registry, index, rule)?;
                rule_count += 1;
            }
        }

        tracing::info!(
            resource = %root,
            ancestors = acl.resources.len() - 1,
            roles = acl.roles.len(),
            rules = rule_count,
            "Built resource ACL"
        );
        Ok(acl)
    }

    /// Load a resource by id and build its ACL.
    pub fn from_resource_id(
        registry: &MapperRegistry,
        resource_id: &ResourceId,
    ) -> Result<Self, PariahError> {
        let resource = load_resource(registry, resource_id)?;
        Self::new(registry, &resource)
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resources[0].id
    }

    /// Ancestor resources, closest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &ResourceId> + '_ {
        self.resources.iter().skip(1).map(|node| &node.id)
    }

    /// Names of every role known to this ACL.
    pub fn roles(&self) -> impl Iterator<Item = &str> + '_ {
        self.roles.iter().map(|node| node.name.as_str())
    }

    /// Whether `user` may perform `action` on the resource.
    ///
    /// Each role the user holds is resolved to its most specific rule.
    /// Across roles the most specific of those wins, and forbid wins among
    /// equals. No roles, no matching rule, or an unnamed action all deny.
    pub fn is_allowed<'a, P>(&self, user: &P, action: impl Into<ActionRef<'a>>) -> bool
    where
        P: Principal + ?Sized,
    {
        let Some(action) = action.into().name() else {
            return false;
        };

        let mut best: Option<(Specificity, Verdict)> = None;
        for role in user.role_names() {
            let Some((rank, verdict)) = self.resolve(user, &role, action) else {
                continue;
            };
            best = match best {
                Some((held, _)) if held < rank => best,
                Some((held, Verdict::Forbid)) if held == rank => best,
                _ => Some((rank, verdict)),
            };
        }
        matches!(best, Some((_, Verdict::Permit)))
    }

    /// Most specific verdict for one role and its ancestors.
    fn resolve<P>(&self, user: &P, role: &str, action: &str) -> Option<(Specificity, Verdict)>
    where
        P: Principal + ?Sized,
    {
        let role_chain = self.role_chain(user, role);
        if role_chain.is_empty() {
            return None;
        }

        let mut resource = Some(0);
        while let Some(res) = resource {
            for (role_depth, &role_idx) in role_chain.iter().enumerate() {
                if let Some(verdict) = self
                    .rules
                    .get(&(res, role_idx))
                    .and_then(|actions| actions.get(action))
                {
                    return Some(((res, role_depth), *verdict));
                }
            }
            resource = self.resources[res].parent;
        }
        None
    }

    /// Arena indices of `role` and its ancestors, closest first.
    ///
    /// Roles missing from the arena are followed through the principal's
    /// own parent links.
    fn role_chain<P>(&self, user: &P, role: &str) -> Vec<usize>
    where
        P: Principal + ?Sized,
    {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(role.to_string());
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                break;
            }
            match self.role_index.get(&name) {
                Some(&index) => {
                    chain.push(index);
                    current = self.roles[index].parent.map(|p| self.roles[p].name.clone());
                }
                None => current = user.parent_of(&name),
            }
        }
        chain
    }

    fn register_rule(
        &mut self,
        registry: &MapperRegistry,
        resource: usize,
        rule: Entity,
    ) -> Result<(), PariahError> {
        let rule = Rule::try_from(rule)?;
        let verdict = rule.verdict()?;
        let rules = registry.component_mapper(EntityKind::Rule)?;
        let roles = rules.fetch_components(registry, &rule, EntityKind::Role)?;
        let actions = rules.fetch_components(registry, &rule, EntityKind::Action)?;

        let mut action_names = Vec::with_capacity(actions.len());
        for action in actions {
            let action = Action::try_from(action)?;
            match action.name() {
                Some(name) => action_names.push(name.to_string()),
                None => {
                    return Err(PariahError::invalid_value("name", &serde_json::Value::Null))
                }
            }
        }

        for role in roles {
            let role_idx = self.register_role(registry, Role::try_from(role)?, &mut Vec::new())?;
            let table = self.rules.entry((resource, role_idx)).or_default();
            for name in &action_names {
                table
                    .entry(name.clone())
                    .and_modify(|existing| {
                        if verdict == Verdict::Forbid {
                            *existing = Verdict::Forbid;
                        }
                    })
                    .or_insert(verdict);
            }
        }
        Ok(())
    }

    /// Register a role after its parent chain. `pending` holds the roles
    /// being registered further up the recursion.
    fn register_role(
        &mut self,
        registry: &MapperRegistry,
        role: Role,
        pending: &mut Vec<String>,
    ) -> Result<usize, PariahError> {
        let name = role
            .name()
            .ok_or_else(|| PariahError::invalid_value("name", &serde_json::Value::Null))?
            .to_string();
        if let Some(&index) = self.role_index.get(&name) {
            return Ok(index);
        }
        if pending.contains(&name) {
            pending.push(name);
            return Err(PariahError::Cycle(format!("role chain {}", pending.join(" -> "))));
        }

        pending.push(name.clone());
        let parent = match role.parent_name() {
            Some(parent_name) => {
                let parent = registry
                    .component_mapper(EntityKind::Role)?
                    .load_model(&Criteria::new().with("name", parent_name))?;
                Some(self.register_role(registry, Role::try_from(parent)?, pending)?)
            }
            None => None,
        };
        pending.pop();

        let index = self.roles.len();
        self.roles.push(RoleNode {
            name: name.clone(),
            parent,
        });
        self.role_index.insert(name, index);
        Ok(index)
    }
}

fn load_resource(registry: &MapperRegistry, id: &ResourceId) -> Result<Resource, PariahError> {
    let kind = id.kind()?;
    let entity = registry
        .component_mapper(kind)?
        .load_model(&Criteria::by_id(id.key()))?;
    Resource::try_from(entity)
}
