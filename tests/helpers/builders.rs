use pariah::inflector;
use pariah::model::{EntityKind, Key};
use pariah::storage::{Row, RowStore};
use serde_json::{json, Value};

fn id_list(ids: &[Key]) -> Value {
    Value::String(ids.join(","))
}

/// Builder for seeding role rows
pub struct RoleBuilder {
    name: String,
    parent: Option<String>,
}

impl RoleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn create(self, store: &dyn RowStore) -> Key {
        let mut row = Row::new();
        row.insert("name".into(), json!(self.name));
        row.insert("parent".into(), self.parent.map_or(Value::Null, Value::String));
        store.insert("roles", &row).expect("Failed to seed role")
    }
}

pub fn seed_action(store: &dyn RowStore, name: &str) -> Key {
    let mut row = Row::new();
    row.insert("name".into(), json!(name));
    store.insert("actions", &row).expect("Failed to seed action")
}

/// Builder for seeding rule rows
pub struct RuleBuilder {
    name: String,
    permit: Value,
    roles: Vec<Key>,
    actions: Vec<Key>,
}

impl RuleBuilder {
    pub fn permit(name: &str) -> Self {
        Self::with_verdict(name, json!(true))
    }

    pub fn forbid(name: &str) -> Self {
        Self::with_verdict(name, json!(false))
    }

    /// Store an arbitrary `permit` value.
    pub fn with_verdict(name: &str, permit: Value) -> Self {
        Self {
            name: name.to_string(),
            permit,
            roles: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn role(mut self, id: &str) -> Self {
        self.roles.push(id.to_string());
        self
    }

    pub fn action(mut self, id: &str) -> Self {
        self.actions.push(id.to_string());
        self
    }

    pub fn create(self, store: &dyn RowStore) -> Key {
        let mut row = Row::new();
        row.insert("name".into(), json!(self.name));
        row.insert("permit".into(), self.permit);
        row.insert("role_ids".into(), id_list(&self.roles));
        row.insert("action_ids".into(), id_list(&self.actions));
        store.insert("rules", &row).expect("Failed to seed rule")
    }
}

/// Builder for seeding rows of any resource kind
pub struct ResourceBuilder {
    kind: EntityKind,
    parent: Option<String>,
    rules: Vec<Key>,
    extra: Row,
}

impl ResourceBuilder {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            parent: None,
            rules: Vec::new(),
            extra: Row::new(),
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn rule(mut self, id: &str) -> Self {
        self.rules.push(id.to_string());
        self
    }

    /// Set any other column, e.g. `user_id` or `title`.
    pub fn column(mut self, column: &str, value: Value) -> Self {
        self.extra.insert(column.to_string(), value);
        self
    }

    pub fn create(self, store: &dyn RowStore) -> Key {
        let mut row = self.extra;
        row.insert("parent".into(), self.parent.map_or(Value::Null, Value::String));
        row.insert("rule_ids".into(), id_list(&self.rules));
        store
            .insert(&inflector::table_name(self.kind.name()), &row)
            .expect("Failed to seed resource")
    }
}

/// Builder for seeding user rows
pub struct UserBuilder {
    username: String,
    password_hash: String,
    roles: Vec<Key>,
}

impl UserBuilder {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            password_hash: "hash123".to_string(),
            roles: Vec::new(),
        }
    }

    pub fn with_password_hash(mut self, hash: &str) -> Self {
        self.password_hash = hash.to_string();
        self
    }

    pub fn role(mut self, id: &str) -> Self {
        self.roles.push(id.to_string());
        self
    }

    pub fn create(self, store: &dyn RowStore) -> Key {
        ResourceBuilder::new(EntityKind::User)
            .column("username", json!(self.username))
            .column("password_hash", json!(self.password_hash))
            .column("role_ids", id_list(&self.roles))
            .create(store)
    }
}
